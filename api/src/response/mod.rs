use serde::Serialize;

/// Standardized wrapper for every JSON response.
///
/// ```json
/// {
///   "success": true,
///   "data": { ... },
///   "message": "Tickets retrieved"
/// }
/// ```
///
/// Errors carry an empty object as `data`:
///
/// ```json
/// {
///   "success": false,
///   "data": {},
///   "message": "Ticket not found"
/// }
/// ```
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Error response with default `data`.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }
}

/// Serializes as `{}`; the payload of responses that carry no data.
#[derive(Serialize, Default)]
pub struct Empty {}
