pub mod controller;
pub mod state;

pub use controller::AlertController;
pub use state::{AlertSession, AlertState, AlertStatus, DismissalStage};
