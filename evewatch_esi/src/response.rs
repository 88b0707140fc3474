use evewatch_core::Timestamp;
use reqwest::StatusCode;

use crate::{cache::CacheInfo, errors::EsiError};

/// The possible outcomes of a completed ESI request. Each is a distinct
/// terminal state; no severity ordering is implied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EsiStatus {
    /// An error that fits no other category, including payload parse errors.
    Error,
    /// Access denied, HTTP 401 and 403.
    AccessError,
    /// The data was not found, HTTP 404 and 410.
    NotFoundError,
    /// The ESI server itself failed, HTTP 500/502/503/504.
    ServerError,
    /// A transport failure: connection reset, closed by peer, time out.
    NetworkError,
    /// The ESI error limit has been exceeded, HTTP 420.
    ErrorCountExceeded,
    /// No new data, HTTP 204 and 304.
    NoNewData,
    /// Request completed; the payload is present.
    Ok,
}

impl EsiStatus {
    pub fn from_http(code: StatusCode) -> Self {
        match code {
            StatusCode::OK => EsiStatus::Ok,
            StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED => EsiStatus::NoNewData,
            StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => EsiStatus::ServerError,
            StatusCode::NOT_FOUND | StatusCode::GONE => EsiStatus::NotFoundError,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EsiStatus::AccessError,
            // 420 is not in the standard status list
            _ if code.as_u16() == 420 => EsiStatus::ErrorCountExceeded,
            _ => EsiStatus::Error,
        }
    }
}

/// One ESI request outcome: a status, the payload when the status is
/// [`EsiStatus::Ok`], and the response metadata worth keeping.
#[derive(Debug)]
pub struct EsiResponse<T> {
    status: EsiStatus,
    payload: Option<T>,
    error: Option<EsiError>,
    cache_info: Option<CacheInfo>,
    pages: u32,
    server_time: Timestamp,
}

impl<T> EsiResponse<T> {
    pub fn success(payload: T, cache_info: CacheInfo, pages: u32, server_time: Timestamp) -> Self {
        Self {
            status: EsiStatus::Ok,
            payload: Some(payload),
            error: None,
            cache_info: Some(cache_info),
            pages: pages.max(1),
            server_time,
        }
    }

    pub fn failure(status: EsiStatus) -> Self {
        Self {
            status,
            payload: None,
            error: None,
            cache_info: None,
            pages: 1,
            server_time: Timestamp::now(),
        }
    }

    pub fn failure_with(status: EsiStatus, error: EsiError) -> Self {
        Self {
            error: Some(error),
            ..Self::failure(status)
        }
    }

    pub fn status(&self) -> EsiStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == EsiStatus::Ok
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    pub fn error(&self) -> Option<&EsiError> {
        self.error.as_ref()
    }

    /// Cache validators to replay on the next request. Only present when
    /// the status is [`EsiStatus::Ok`].
    pub fn cache_info(&self) -> Option<&CacheInfo> {
        self.cache_info.as_ref()
    }

    /// The number of pages in the data, at least 1.
    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// The clock on the ESI server, as reported by the response.
    pub fn server_time(&self) -> Timestamp {
        self.server_time
    }
}
