pub mod dashboard;
pub mod errors;
pub mod reports;
pub mod session;

pub use dashboard::DashboardService;
pub use errors::ServiceError;
pub use reports::{BiasReport, Holding, PortfolioReport};
pub use session::{SessionContext, VisitRecord};
