use thiserror::Error;

/// Erreurs de validation des contrats du deck (layouts, pages, table des boutons)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("invalid layout '{0}': expected <rows>x<cols>")]
    InvalidLayout(String),

    #[error("layout {rows}x{cols} out of range (1..={max} per dimension)")]
    LayoutOutOfRange { rows: u16, cols: u16, max: u16 },

    #[error("duplicate button at row {row}, col {col} (page: {page})")]
    DuplicateButton { page: String, row: u16, col: u16 },

    #[error("widget button '{0}' has no metric key")]
    WidgetWithoutMetric(String),

    #[error("button '{0}' has no action payload")]
    MissingPayload(String),

    #[error("duplicate page id '{0}'")]
    DuplicatePage(String),

    #[error("page list is empty")]
    NoPages,
}
