pub mod outbound;

pub use outbound::{
    BlobStore, EmailSender, RouteProvider, RouteSummary, TokenRevocationStore, TravelMode,
};
