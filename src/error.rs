use thiserror::Error;

/// Failures of the peak-fit engine.
///
/// Input problems are detected before the solver runs; the remaining variants
/// come out of the solver itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// Malformed binned sample or fit configuration.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Fewer bins than free parameters in the chosen model.
    #[error("Insufficient data: model needs at least {expected} bins, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// The model produced NaN/inf at the starting point.
    #[error("Model is not finite at the initial guess: {0}")]
    NonFinite(String),

    /// The solver hit its iteration cap or could not reduce the residual.
    #[error("Fit did not converge after {iterations} iterations: {reason}")]
    NotConverged { iterations: usize, reason: String },

    /// The Jacobian at the solution resolves no parameter direction at all.
    #[error("Singular Jacobian at the solution (rank {rank} < {params} parameters)")]
    SingularJacobian { rank: usize, params: usize },
}

impl FitError {
    /// True for failures detected before any solver work.
    pub fn is_input_error(&self) -> bool {
        matches!(self, FitError::InvalidInput(_) | FitError::InsufficientData { .. })
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let code = if err.is_input_error() { 2 } else { 4 };
        AppError::new(code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
