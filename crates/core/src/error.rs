//! Error types for table compilation, invocation and assembly.

/// Compilation errors. Any of these aborts the enclosing scan; nothing is
/// downgraded or retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// Empty root type list, or an otherwise unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A member carries more than one structural role.
    #[error("member '{member}' of {builder} carries more than one role: {roles}")]
    AmbiguousBinding {
        builder: String,
        member: String,
        roles: String,
    },

    /// A requested feature is not implemented (mixed content).
    #[error("unsupported on member '{member}' of {builder}: {feature}")]
    Unsupported {
        builder: String,
        member: String,
        feature: String,
    },

    /// A member's signature does not fit its role.
    #[error("wrong signature for member '{member}' of {builder}: {reason}")]
    WrongSignature {
        builder: String,
        member: String,
        reason: String,
    },

    /// No builder type or factory could be resolved for a target type.
    #[error("cannot resolve a builder for {target}: {reason}")]
    ResolutionFailure { target: String, reason: String },

    /// `ParsingInfoBuilder::build` was called before a builder type and
    /// factory were set.
    #[error("incomplete binding table: {0}")]
    IncompleteTable(String),
}

impl BindingError {
    /// Stable machine-readable kind, used by JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            BindingError::InvalidArgument(_) => "invalid_argument",
            BindingError::AmbiguousBinding { .. } => "ambiguous_binding",
            BindingError::Unsupported { .. } => "unsupported",
            BindingError::WrongSignature { .. } => "wrong_signature",
            BindingError::ResolutionFailure { .. } => "resolution_failure",
            BindingError::IncompleteTable(_) => "incomplete_table",
        }
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "kind":    self.kind(),
            "message": self.to_string(),
        })
    }
}

/// Failures raised while an invoker applies a value to a builder instance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    /// The supplied builder instance is not of the type the invoker was
    /// compiled against.
    #[error("member '{member}' expects a {expected} builder")]
    BuilderMismatch {
        member: &'static str,
        expected: &'static str,
    },

    /// An element value is not of the member's parameter type.
    #[error("member '{member}' expects a {expected} value")]
    ValueMismatch {
        member: &'static str,
        expected: &'static str,
    },

    /// A textual value could not be decoded into the member's parameter type.
    #[error("member '{member}' cannot decode '{value}': {message}")]
    Decode {
        member: &'static str,
        value: String,
        message: String,
    },
}

/// Failures raised when a filled builder is converted into its value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("missing required field '{0}'")]
    Missing(&'static str),

    #[error("invalid value: {0}")]
    Invalid(String),

    /// The scalar fallback was bound to a type with no registered decoder.
    #[error("no scalar decoder registered for {0}")]
    NoDecoder(String),

    #[error("cannot decode '{value}' as {target}: {message}")]
    Decode {
        target: String,
        value: String,
        message: String,
    },
}

/// Failures while driving binding tables from an event stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssembleError {
    #[error("no root binding for element {0}")]
    UnknownRoot(String),

    #[error("element {name} is not allowed inside {parent}")]
    UnexpectedElement { parent: String, name: String },

    #[error("attribute {name} is not allowed on {element}")]
    UnexpectedAttribute { element: String, name: String },

    #[error("text content is not allowed in {0}")]
    UnexpectedText(String),

    #[error("mixed text and element content in {0}")]
    MixedContent(String),

    /// A back reference points above the outermost open table.
    #[error("element {element} refers to a table {distance} level(s) up, which is not open")]
    DanglingReference { element: String, distance: usize },

    /// An end event arrived with no open element.
    #[error("unbalanced end event")]
    Unbalanced,

    /// The stream ended with elements still open.
    #[error("event stream ended with {0} open element(s)")]
    Incomplete(usize),

    /// The stream contained no root element.
    #[error("event stream contains no root element")]
    Empty,

    /// A structural event followed the closed root element.
    #[error("unexpected event after the root element was closed")]
    Trailing,

    #[error("assembled value is not a {0}")]
    OutputMismatch(&'static str),

    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl AssembleError {
    pub fn kind(&self) -> &'static str {
        match self {
            AssembleError::UnknownRoot(_) => "unknown_root",
            AssembleError::UnexpectedElement { .. } => "unexpected_element",
            AssembleError::UnexpectedAttribute { .. } => "unexpected_attribute",
            AssembleError::UnexpectedText(_) => "unexpected_text",
            AssembleError::MixedContent(_) => "mixed_content",
            AssembleError::DanglingReference { .. } => "dangling_reference",
            AssembleError::Unbalanced => "unbalanced",
            AssembleError::Incomplete(_) => "incomplete",
            AssembleError::Empty => "empty",
            AssembleError::Trailing => "trailing",
            AssembleError::OutputMismatch(_) => "output_mismatch",
            AssembleError::Invoke(_) => "invoke",
            AssembleError::Build(_) => "build",
        }
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "kind":    self.kind(),
            "message": self.to_string(),
        })
    }
}
