pub mod assignment;
pub mod blocked;
pub mod guest;
pub mod seat;
pub mod settings;
pub mod status;

pub use assignment::{AssignmentRecord, DayAssignment, DaySeating};
pub use blocked::BlockedSeat;
pub use guest::{Day, DayRank, Guest, GuestId, Tier};
pub use seat::{Seat, SeatMatrix, SeatRow};
pub use settings::Settings;
pub use status::SeatingStatus;
