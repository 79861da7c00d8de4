//! Prelude module - common imports for carburant users
//!
//! ```rust
//! use carburant::prelude::*;
//! ```

pub use crate::{
    // Pipeline
    extract_sheet,
    fit_by_type,
    fit_or_default,
    monthly_summary,
    sheet_names,
    vehicle_performance,

    // Errors
    Error,
    // Options
    ExtractOptions,
    // Results
    Extraction,
    MonthlySummary,
    RegressionOptions,
    RegressionResult,
    Result,

    UploadStore,
    UploadToken,
    VehiclePerformance,
    VehicleRecord,
    VehicleType,
    // Main types
    Workbook,
};
