use reqwest::Url;

use crate::{cache::CacheInfo, endpoint::Endpoint, errors::EsiError};

/// The body encoding to declare on a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Json,
    FormUrlEncoded,
}

impl ContentType {
    pub fn media_type(self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::FormUrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

/// The ESI cluster to query. Tranquility is the default and is omitted
/// from the query string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataSource {
    Tranquility,
    Singularity,
}

impl DataSource {
    pub fn query_value(self) -> &'static str {
        match self {
            DataSource::Tranquility => "tranquility",
            DataSource::Singularity => "singularity",
        }
    }
}

/// The response language to request. English is the default and is omitted
/// from the query string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    English,
    German,
    French,
    Japanese,
    Russian,
    Chinese,
}

impl Language {
    pub fn query_value(self) -> &'static str {
        match self {
            Language::English => "en-us",
            Language::German => "de",
            Language::French => "fr",
            Language::Japanese => "ja",
            Language::Russian => "ru",
            Language::Chinese => "zh",
        }
    }
}

/// One logical ESI request: the endpoint plus everything that varies per
/// call. The prior response's [`CacheInfo`] may be attached to get
/// conditional-request semantics.
#[derive(Clone, Debug)]
pub struct EsiRequest {
    pub endpoint: Endpoint,
    path_suffix: String,
    parameters: Vec<(String, String)>,
    pub cache_info: Option<CacheInfo>,
    pub content_type: ContentType,
    pub data_source: DataSource,
}

impl EsiRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            path_suffix: String::new(),
            parameters: Vec::new(),
            cache_info: None,
            content_type: ContentType::Json,
            data_source: DataSource::Tranquility,
        }
    }

    /// Appends a path segment after the endpoint's base path, e.g. a
    /// region ID for the public contracts endpoint.
    pub fn path(mut self, suffix: impl Into<String>) -> Self {
        self.path_suffix = suffix.into();
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    pub fn cache_info(mut self, cache_info: CacheInfo) -> Self {
        self.cache_info = Some(cache_info);
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn data_source(mut self, data_source: DataSource) -> Self {
        self.data_source = data_source;
        self
    }

    /// Builds the absolute request URL. ESI rejects paths without a
    /// trailing slash, so one is always appended.
    pub fn url(&self, base_url: &Url, language: Language) -> Result<Url, EsiError> {
        let info = self.endpoint.info();
        let mut path = String::from(info.path);
        path.push_str(&self.path_suffix);
        if !path.ends_with('/') {
            path.push('/');
        }

        let mut url = base_url.clone();
        url.set_path(&path);

        let mut query: Vec<(&str, &str)> = Vec::with_capacity(self.parameters.len() + 2);
        if language != Language::English && info.localizable {
            query.push(("lang", language.query_value()));
        }
        if self.data_source != DataSource::Tranquility {
            query.push(("datasource", self.data_source.query_value()));
        }
        for (key, value) in &self.parameters {
            query.push((key, value));
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}
