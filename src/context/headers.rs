//! Header names and canonical context keys.

/// Identifier stable across an entire logical call chain.
pub const CORRELATION_ID_HEADER: &str = "x-ms-correlation-request-id";
/// Identifier for one specific request, generated if absent.
pub const OPERATION_ID_HEADER: &str = "x-ms-acs-operation-id";
/// Caller-specified value identifying the request.
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";
pub const CLIENT_APP_ID_HEADER: &str = "x-ms-client-app-id";
pub const CLIENT_PRINCIPAL_NAME_HEADER: &str = "x-ms-client-principal-name";
pub const CLIENT_TENANT_ID_HEADER: &str = "x-ms-client-tenant-id";
pub const ACCEPT_LANGUAGE_HEADER: &str = "accept-language";
pub const REGION_HEADER: &str = "region";

pub const CORRELATION_ID_KEY: &str = "correlation_id";
pub const OPERATION_ID_KEY: &str = "operation_id";
pub const CLIENT_REQUEST_ID_KEY: &str = "client_request_id";
pub const TENANT_ID_KEY: &str = "tenant_id";
pub const ACCEPT_LANGUAGE_KEY: &str = "accept_language";

/// Headers that carry request identifiers on outbound calls.
pub const IDENTIFIER_HEADERS: [(&str, &str); 3] = [
    (CORRELATION_ID_KEY, CORRELATION_ID_HEADER),
    (OPERATION_ID_KEY, OPERATION_ID_HEADER),
    (CLIENT_REQUEST_ID_KEY, CLIENT_REQUEST_ID_HEADER),
];

/// Response header that mirrors the given canonical key, if it can be mirrored.
pub fn response_header_for(key: &str) -> Option<&'static str> {
    match key {
        OPERATION_ID_KEY => Some(OPERATION_ID_HEADER),
        CLIENT_REQUEST_ID_KEY => Some(CLIENT_REQUEST_ID_HEADER),
        CORRELATION_ID_KEY => Some(CORRELATION_ID_HEADER),
        _ => None,
    }
}
