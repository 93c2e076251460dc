mod service;

pub use service::{ReclamationReport, ReclamationService};
