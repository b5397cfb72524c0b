use thiserror::Error;

#[derive(Error, Debug)]
pub enum CasebookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "xlsx")]
    #[error("Workbook read error: {0}")]
    Read(#[from] calamine::Error),

    #[cfg(feature = "xlsx")]
    #[error("Workbook write error: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Unknown case: {0}")]
    UnknownCase(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Unsupported workbook format: {0}")]
    UnsupportedFormat(String),

    #[error("Workbook changed on disk since it was loaded: {0}\nRe-run the command, or pass --force to overwrite.")]
    StaleWorkbook(String),

    #[error("At most {max} years can be compared side by side (got {got})")]
    TooManyYears { max: usize, got: usize },

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, CasebookError>;
