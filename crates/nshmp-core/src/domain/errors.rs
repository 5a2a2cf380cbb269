use std::error::Error;
use std::fmt::{Display, Formatter};

pub type NshmpResult<T> = Result<T, NshmpError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NshmpErrorCategory {
    FileFormatError,
    ConfigurationError,
    NumericalInstabilityError,
    IoSystemError,
    InternalError,
}

/// How much work an error invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorScope {
    /// The source being built; the reader continues with the next one.
    Source,
    /// The file being read.
    File,
    /// The whole model, since its inputs are inconsistent.
    Model,
    /// The current run.
    Run,
}

impl NshmpErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::FileFormatError => 2,
            Self::ConfigurationError => 3,
            Self::NumericalInstabilityError => 4,
            Self::IoSystemError => 5,
            Self::InternalError => 6,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::FileFormatError => "FileFormatError",
            Self::ConfigurationError => "ConfigurationError",
            Self::NumericalInstabilityError => "NumericalInstabilityError",
            Self::IoSystemError => "IoSystemError",
            Self::InternalError => "InternalError",
        }
    }

    pub const fn scope(self) -> ErrorScope {
        match self {
            Self::ConfigurationError => ErrorScope::Source,
            Self::FileFormatError | Self::IoSystemError => ErrorScope::File,
            Self::NumericalInstabilityError => ErrorScope::Model,
            Self::InternalError => ErrorScope::Run,
        }
    }

    /// Errors that invalidate the whole model rather than one file or source.
    pub const fn is_model_fatal(self) -> bool {
        matches!(self.scope(), ErrorScope::Model)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NshmpError {
    category: NshmpErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl NshmpError {
    pub fn new(
        category: NshmpErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn file_format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(NshmpErrorCategory::FileFormatError, placeholder, message)
    }

    pub fn configuration(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(NshmpErrorCategory::ConfigurationError, placeholder, message)
    }

    pub fn numerical_instability(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            NshmpErrorCategory::NumericalInstabilityError,
            placeholder,
            message,
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(NshmpErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(NshmpErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> NshmpErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for NshmpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.name(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for NshmpError {}
