//! Gists from GitHub REST API and related functions.

#![cfg(feature = "github")]

use std::{collections::HashMap, fmt::Display};

use reqwest::{Client, Method, RequestBuilder, header};
use serde::{Deserialize, Serialize};

/// Represents a gist from GitHub REST API.
#[derive(Debug, Deserialize, Clone)]
pub struct Gist {
    pub id: String,
    pub html_url: String,
    pub description: Option<String>,
    pub public: bool,
    pub files: HashMap<String, GistFile>,
}

impl Gist {
    /// The raw URL of a file in this gist.
    pub fn raw_url(&self, filename: &str) -> Option<&str> {
        self.files
            .get(filename)
            .and_then(|file| file.raw_url.as_deref())
    }
}

impl Display for Gist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.id, self.html_url)
    }
}

/// Represents a file of a [`Gist`].
#[derive(Debug, Deserialize, Clone)]
pub struct GistFile {
    pub filename: Option<String>,
    pub raw_url: Option<String>,
    pub size: Option<u64>,
}

/// The body to create or update a gist.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct GistRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    pub files: HashMap<String, GistContent>,
}

/// The content of a file inside a [`GistRequest`].
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct GistContent {
    pub content: String,
}

/// Builds a request for GitHub REST API.
pub fn github_api_request_builder(
    client: &Client,
    method: Method,
    url: &str,
    token: &str,
) -> RequestBuilder {
    client
        .request(method, url)
        .header(header::ACCEPT, "application/vnd.github+json")
        .bearer_auth(token)
        .header("X-GitHub-Api-Version", "2022-11-28")
}
