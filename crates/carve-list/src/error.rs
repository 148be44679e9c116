//! Error types for `carve-list`.

use std::fmt;

/// Failure of a fallible in-place insertion.
///
/// In both cases the list is left exactly as it was and the node block, if
/// one was reserved, has already gone back to the resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListError<E> {
    /// The resource could not provide a node block.
    Alloc(carve_mem::Error),
    /// The value constructor failed after the block was reserved.
    Construct(E),
}

impl<E> ListError<E> {
    /// The constructor error, if that is what failed.
    pub fn into_construct(self) -> Option<E> {
        match self {
            ListError::Construct(err) => Some(err),
            ListError::Alloc(_) => None,
        }
    }
}

impl<E> From<carve_mem::Error> for ListError<E> {
    fn from(err: carve_mem::Error) -> Self {
        ListError::Alloc(err)
    }
}

impl<E: fmt::Display> fmt::Display for ListError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListError::Alloc(err) => write!(f, "Node allocation failed: {err}"),
            ListError::Construct(err) => {
                write!(f, "Element construction failed: {err}")
            }
        }
    }
}

impl<E> std::error::Error for ListError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListError::Alloc(err) => Some(err),
            ListError::Construct(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[derive(Debug)]
    struct BadInput;

    impl fmt::Display for BadInput {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "bad input")
        }
    }

    impl std::error::Error for BadInput {}

    #[test]
    fn test_error_display() {
        let err: ListError<BadInput> = carve_mem::Error::ZeroSize.into();
        assert_eq!(
            err.to_string(),
            "Node allocation failed: Zero-sized allocation requested"
        );
        assert_eq!(
            ListError::Construct(BadInput).to_string(),
            "Element construction failed: bad input"
        );
    }

    #[test]
    fn test_error_source_and_unwrap() {
        let err = ListError::Construct(BadInput);
        assert!(err.source().is_some());
        assert!(err.into_construct().is_some());

        let err: ListError<BadInput> = ListError::Alloc(carve_mem::Error::ZeroSize);
        assert!(err.into_construct().is_none());
    }
}
