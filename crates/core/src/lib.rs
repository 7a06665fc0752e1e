pub mod config;
pub mod domain;
pub mod errors;

pub use domain::directory::{
    AdministrativeService, CalendarEvent, Course, DirectoryFilter, Fee, Hostel, LibraryService,
};
pub use domain::query::{Fingerprint, Query};
pub use domain::session::SessionContext;
pub use domain::Domain;
pub use errors::{ApplicationError, FailureClass, InterfaceError, ToolError};
