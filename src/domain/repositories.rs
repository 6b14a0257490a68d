//! Aggregated repository access used by the application services

use crate::domain::password_reset::PasswordResetRepository;
use crate::domain::rating::RatingRepository;
use crate::domain::trip::TripRepository;
use crate::domain::user::UserRepository;
use crate::domain::vehicle::VehicleRepository;

/// One accessor per aggregate; the concrete provider owns the connection
/// pool and hands out trait objects.
pub trait RepositoryProvider: Send + Sync {
    fn users(&self) -> &dyn UserRepository;
    fn vehicles(&self) -> &dyn VehicleRepository;
    fn trips(&self) -> &dyn TripRepository;
    fn password_resets(&self) -> &dyn PasswordResetRepository;
    fn ratings(&self) -> &dyn RatingRepository;
}
