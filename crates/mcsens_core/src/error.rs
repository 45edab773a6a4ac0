use std::fmt;

/// Error type returned by a forward process.
///
/// The core never inspects it; it is carried to the caller untouched.
pub type ForwardError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which forward-process invocation of a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardStage {
    /// The call on the unperturbed table
    Baseline,
    /// The call on the replicated, perturbed table
    Perturbed,
}

impl fmt::Display for ForwardStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardStage::Baseline => write!(f, "baseline"),
            ForwardStage::Perturbed => write!(f, "perturbed"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SensitivityError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no usable rows for variable '{variable}' after dropping missing values")]
    InsufficientData { variable: String },

    #[error("forward process failed during the {stage} run: {source}")]
    ForwardProcess {
        stage: ForwardStage,
        #[source]
        source: ForwardError,
    },

    #[error("forward process returned {actual} rows for {expected} input rows ({stage} run)")]
    ForwardShape {
        stage: ForwardStage,
        expected: usize,
        actual: usize,
    },

    #[error("forward process output has no column '{variable}'")]
    MissingOutput { variable: String },

    #[error("pair ({input} -> {output}): {source}")]
    Pair {
        input: String,
        output: String,
        #[source]
        source: Box<SensitivityError>,
    },
}

impl SensitivityError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SensitivityError::InvalidArgument(msg.into())
    }

    pub(crate) fn in_pair(self, input: &str, output: &str) -> Self {
        SensitivityError::Pair {
            input: input.to_string(),
            output: output.to_string(),
            source: Box::new(self),
        }
    }

    /// The forward-process error, if this failure originated in the caller's model.
    pub fn forward_source(&self) -> Option<&ForwardError> {
        match self {
            SensitivityError::ForwardProcess { source, .. } => Some(source),
            SensitivityError::Pair { source, .. } => source.forward_source(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SensitivityError>;
