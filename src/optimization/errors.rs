//! Error surface for the least-squares optimizer.
//!
//! Every failure the optimizer can produce (invalid configuration, a bad model
//! evaluation, or an unsuccessful termination of the Levenberg–Marquardt
//! backend) is normalized into [`OptError`]. Callers never see the backend's
//! `TerminationReason`: [`OptError::from_termination`] maps each unsuccessful
//! reason onto a variant here.
use levenberg_marquardt::TerminationReason;

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Jacobian ----
    /// Implies that finite differences should be used.
    JacobianNotImplemented,

    /// Jacobian shape does not match `(n_residuals, n_params)`.
    JacobianDimMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Jacobian entries need to be finite.
    InvalidJacobian {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- Residuals ----
    /// Residual vector length does not match the number of observations.
    ResidualDimMismatch {
        expected: usize,
        found: usize,
    },

    /// Model evaluation produced a non-finite residual.
    NonFiniteResidual {
        index: usize,
        value: f64,
    },

    /// Fewer observations than free parameters.
    InsufficientData {
        n_obs: usize,
        n_params: usize,
    },

    // ---- LsqOptions ----
    /// Parameter-change tolerance needs to be positive and finite.
    InvalidXTol {
        tol: f64,
        reason: &'static str,
    },
    /// Relative cost-reduction tolerance needs to be positive and finite.
    InvalidFTol {
        tol: f64,
        reason: &'static str,
    },
    /// Gradient tolerance needs to be positive and finite.
    InvalidGTol {
        tol: f64,
        reason: &'static str,
    },
    /// Evaluation budget needs to be positive.
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    /// Initial step bound factor needs to be positive and finite.
    InvalidStepBound {
        value: f64,
        reason: &'static str,
    },

    // ---- Bounds ----
    /// Lower and upper bounds have different lengths, or do not match θ.
    BoundsDimMismatch {
        expected: usize,
        found: usize,
    },

    /// A (lower, upper) pair is unordered or contains NaN.
    InvalidBounds {
        index: usize,
        lower: f64,
        upper: f64,
        reason: &'static str,
    },

    // ---- Parameter input ----
    /// Initial θ has the wrong length for the model.
    ThetaLengthMismatch {
        expected: usize,
        actual: usize,
    },

    /// Initial θ must have finite values.
    InvalidThetaInput {
        index: usize,
        value: f64,
    },

    // ---- Solver ----
    /// The backend hit a numerical breakdown (e.g. a non-finite Jacobian
    /// norm) and could not continue.
    NumericalBreakdown {
        reason: &'static str,
    },

    /// Evaluation budget spent before any convergence test passed.
    MaxIterReached {
        max_iter: usize,
    },

    /// Cost function returned a non-finite value.
    NonFiniteCost {
        value: f64,
    },

    /// Estimated parameters must be finite.
    InvalidThetaHat {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    /// Any other unsuccessful backend termination.
    BackendError {
        text: String,
    },

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Jacobian ----
            OptError::JacobianNotImplemented => {
                write!(f, "Analytic Jacobian not implemented; finite differences required")
            }
            OptError::JacobianDimMismatch { expected, found } => {
                write!(
                    f,
                    "Jacobian dimension mismatch: expected {}x{}, found {}x{}",
                    expected.0, expected.1, found.0, found.1
                )
            }
            OptError::InvalidJacobian { row, col, value } => {
                write!(f, "Invalid Jacobian entry at ({row}, {col}): {value}, must be finite")
            }

            // ---- Residuals ----
            OptError::ResidualDimMismatch { expected, found } => {
                write!(f, "Residual length mismatch: expected {expected}, found {found}")
            }
            OptError::NonFiniteResidual { index, value } => {
                write!(f, "Non-finite residual at index {index}: {value}")
            }
            OptError::InsufficientData { n_obs, n_params } => {
                write!(
                    f,
                    "Insufficient data: {n_obs} observations cannot determine {n_params} parameters"
                )
            }

            // ---- LsqOptions ----
            OptError::InvalidXTol { tol, reason } => {
                write!(f, "Invalid parameter-change tolerance {tol}: {reason}")
            }
            OptError::InvalidFTol { tol, reason } => {
                write!(f, "Invalid cost-reduction tolerance {tol}: {reason}")
            }
            OptError::InvalidGTol { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid evaluation budget {max_iter}: {reason}")
            }
            OptError::InvalidStepBound { value, reason } => {
                write!(f, "Invalid initial step bound {value}: {reason}")
            }

            // ---- Bounds ----
            OptError::BoundsDimMismatch { expected, found } => {
                write!(f, "Bounds length mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidBounds { index, lower, upper, reason } => {
                write!(f, "Invalid bounds at index {index}: ({lower}, {upper}). {reason}")
            }

            // ---- Parameter input ----
            OptError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Theta length mismatch: expected {expected}, actual {actual}")
            }
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "Invalid theta input at index {index}: {value}, must be finite")
            }

            // ---- Solver ----
            OptError::NumericalBreakdown { reason } => {
                write!(f, "Numerical breakdown in the solver: {reason}")
            }
            OptError::MaxIterReached { max_iter } => {
                write!(f, "Optimal parameters not found: reached {max_iter} function evaluations")
            }
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite cost value: {value}")
            }
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Invalid theta_hat at index {index}: {value}. {reason}")
            }

            OptError::BackendError { text } => {
                write!(f, "Levenberg-Marquardt terminated unsuccessfully: {text}")
            }

            // ---- Fallback ----
            OptError::UnknownError => {
                write!(f, "Unknown error")
            }
        }
    }
}

impl OptError {
    /// Map an unsuccessful backend termination onto an [`OptError`].
    ///
    /// `max_iter` is the evaluation budget the run was configured with, so it
    /// can be reported back on `LostPatience`.
    pub fn from_termination(reason: &TerminationReason, max_iter: usize) -> Self {
        match reason {
            TerminationReason::LostPatience => OptError::MaxIterReached { max_iter },
            TerminationReason::Numerical(what) => OptError::NumericalBreakdown { reason: *what },
            other => OptError::BackendError { text: format!("{other:?}") },
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<OptError> for pyo3::PyErr {
    fn from(err: OptError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
