//! Backend status channel and its one-time decoding.

use crate::error::StoreResult;

/// `errSecSuccess`.
pub const ERR_SEC_SUCCESS: i32 = 0;
/// `errSecItemNotFound`.
pub const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;
/// `errSecDuplicateItem`.
pub const ERR_SEC_DUPLICATE_ITEM: i32 = -25299;
/// `errSecParam`, used when an update asks for an attribute change the
/// backend cannot apply in place.
pub const ERR_SEC_PARAM: i32 = -50;

/// Outcome of a backend primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum BackendStatus {
    /// The call succeeded.
    Success,
    /// No record matched.
    NotFound,
    /// A record with the same identity already exists.
    Duplicate,
    /// Any other failure, with the raw OS status.
    Failure {
        /// OS-specific status code.
        code: i32,
    },
}

impl BackendStatus {
    /// Classifies a raw OS status.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            ERR_SEC_SUCCESS => Self::Success,
            ERR_SEC_ITEM_NOT_FOUND => Self::NotFound,
            ERR_SEC_DUPLICATE_ITEM => Self::Duplicate,
            code => Self::Failure { code },
        }
    }

    /// Returns the raw OS status.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => ERR_SEC_SUCCESS,
            Self::NotFound => ERR_SEC_ITEM_NOT_FOUND,
            Self::Duplicate => ERR_SEC_DUPLICATE_ITEM,
            Self::Failure { code } => code,
        }
    }

    /// Decodes a status where "not found" is an acceptable answer.
    ///
    /// Returns `Ok(true)` on success, `Ok(false)` on not-found.
    ///
    /// # Errors
    ///
    /// Any other status becomes [`crate::StoreError::Backend`].
    pub fn found(self) -> StoreResult<bool> {
        match self {
            Self::Success => Ok(true),
            Self::NotFound => Ok(false),
            status => Err(status.into()),
        }
    }

    /// Decodes a status where only success is acceptable.
    ///
    /// # Errors
    ///
    /// Any non-success status, not-found and duplicate included, becomes
    /// [`crate::StoreError::Backend`].
    pub fn succeeded(self) -> StoreResult<()> {
        match self {
            Self::Success => Ok(()),
            status => Err(status.into()),
        }
    }
}

impl From<i32> for BackendStatus {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use test_case::test_case;

    #[test_case(0, BackendStatus::Success)]
    #[test_case(-25300, BackendStatus::NotFound)]
    #[test_case(-25299, BackendStatus::Duplicate)]
    #[test_case(-34018, BackendStatus::Failure { code: -34018 } ; "missing entitlement")]
    #[test_case(-25308, BackendStatus::Failure { code: -25308 } ; "interaction not allowed")]
    fn test_from_code_round_trips(code: i32, expected: BackendStatus) {
        let status = BackendStatus::from_code(code);
        assert_eq!(status, expected);
        assert_eq!(status.code(), code);
    }

    #[test]
    fn test_found_treats_not_found_as_absent() {
        assert_eq!(BackendStatus::Success.found(), Ok(true));
        assert_eq!(BackendStatus::NotFound.found(), Ok(false));
        assert_eq!(
            BackendStatus::Duplicate.found(),
            Err(StoreError::Backend {
                code: ERR_SEC_DUPLICATE_ITEM
            })
        );
        assert_eq!(
            BackendStatus::Failure { code: -4 }.found(),
            Err(StoreError::Backend { code: -4 })
        );
    }

    #[test]
    fn test_succeeded_rejects_not_found() {
        assert_eq!(BackendStatus::Success.succeeded(), Ok(()));
        assert_eq!(
            BackendStatus::NotFound.succeeded(),
            Err(StoreError::Backend {
                code: ERR_SEC_ITEM_NOT_FOUND
            })
        );
    }
}
