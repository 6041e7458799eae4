use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Distinguishes request validation failures from failures reported by the
/// external engine. Validation kinds are produced before any process is
/// spawned; `Engine` carries whatever the engine (or its probe) reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingInput,
    MissingOutput,
    InvalidMode,
    Engine,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    context: String,
    cause: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    pub fn new<S: Into<String>>(kind: ErrorKind, context: S) -> Self {
        Error {
            kind,
            context: context.into(),
            cause: None,
        }
    }

    pub fn engine<S: Into<String>>(context: S) -> Self {
        Error::new(ErrorKind::Engine, context)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.context)?;
        if let Some(cause) = self.source() {
            write!(f, "\nCaused by: {}", cause)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn StdError + 'static))
    }
}

pub trait ResultExt<T> {
    fn context<S: Into<String>>(self, message: S) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context<S: Into<String>>(self, message: S) -> Result<T> {
        self.map_err(|e| Error {
            kind: ErrorKind::Engine,
            context: message.into(),
            cause: Some(Box::new(e)),
        })
    }
}
