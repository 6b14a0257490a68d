//! Known-stop catalog and route snapping
//!
//! A static slice of the TransMilenio network around the northern corridor,
//! enough for trip-creation snapping and the public catalog endpoints. The
//! snapping itself is a pure function so it stays unit-testable.

use crate::domain::geo::{haversine_m, GeoPoint};

/// TransMilenio station (a stop grouping).
#[derive(Debug, Clone, Copy)]
pub struct Station {
    pub id: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

/// Boardable stop, attached to a station.
#[derive(Debug, Clone, Copy)]
pub struct Stop {
    pub id: &'static str,
    pub station_id: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Stop {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Named route over the catalog stops.
#[derive(Debug, Clone, Copy)]
pub struct BusRoute {
    pub id: &'static str,
    pub name: &'static str,
    pub stop_ids: &'static [&'static str],
}

pub const STATIONS: &[Station] = &[
    Station {
        id: "st-portal-norte",
        name: "Portal Norte",
        lat: 4.7546,
        lng: -74.0461,
    },
    Station {
        id: "st-toberin",
        name: "Toberín",
        lat: 4.7451,
        lng: -74.0449,
    },
    Station {
        id: "st-calle-146",
        name: "Calle 146",
        lat: 4.7254,
        lng: -74.0486,
    },
    Station {
        id: "st-calle-100",
        name: "Calle 100",
        lat: 4.6829,
        lng: -74.0553,
    },
];

pub const STOPS: &[Stop] = &[
    Stop {
        id: "stop-portal-norte-a",
        station_id: "st-portal-norte",
        name: "Portal Norte - Vagón A",
        lat: 4.7548,
        lng: -74.0463,
    },
    Stop {
        id: "stop-portal-norte-b",
        station_id: "st-portal-norte",
        name: "Portal Norte - Vagón B",
        lat: 4.7543,
        lng: -74.0458,
    },
    Stop {
        id: "stop-toberin",
        station_id: "st-toberin",
        name: "Toberín",
        lat: 4.7451,
        lng: -74.0449,
    },
    Stop {
        id: "stop-calle-146",
        station_id: "st-calle-146",
        name: "Calle 146",
        lat: 4.7254,
        lng: -74.0486,
    },
    Stop {
        id: "stop-calle-100",
        station_id: "st-calle-100",
        name: "Calle 100",
        lat: 4.6829,
        lng: -74.0553,
    },
];

pub const ROUTES: &[BusRoute] = &[
    BusRoute {
        id: "route-b74",
        name: "B74 Portal Norte - Calle 100",
        stop_ids: &[
            "stop-portal-norte-a",
            "stop-toberin",
            "stop-calle-146",
            "stop-calle-100",
        ],
    },
    BusRoute {
        id: "route-b12",
        name: "B12 Portal Norte - Toberín",
        stop_ids: &["stop-portal-norte-b", "stop-toberin"],
    },
];

pub fn find_stop(id: &str) -> Option<&'static Stop> {
    STOPS.iter().find(|s| s.id == id)
}

/// Nearest catalog stop to a point, with the distance in meters.
pub fn nearest_stop(point: GeoPoint, stops: &'static [Stop]) -> Option<(&'static Stop, f64)> {
    stops
        .iter()
        .map(|s| (s, haversine_m(point, s.location())))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Snap a traversed route onto known stops.
///
/// Each point maps to its nearest stop; consecutive duplicates and stops
/// already visited earlier in the traversal collapse, preserving order.
pub fn snap_route_to_stops(route: &[GeoPoint], stops: &'static [Stop]) -> Vec<&'static Stop> {
    let mut out: Vec<&'static Stop> = Vec::new();
    for point in route {
        if let Some((stop, _)) = nearest_stop(*point, stops) {
            if !out.iter().any(|s| s.id == stop.id) {
                out.push(stop);
            }
        }
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────
