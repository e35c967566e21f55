//! # Staging
//!
//! - `StagingCoordinator`: stato per singolo candidato (copia, strategia, misura, decisione)
//! - `Scanner`: pool di worker limitato che produce il `ChangeLedger`

pub mod coordinator;
pub mod scanner;

pub use coordinator::{StageOutcome, StagingCoordinator};
pub use scanner::{ScanReport, Scanner};
