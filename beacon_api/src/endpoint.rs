use core::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use anyhow::{anyhow, ensure, Context as _, Error as AnyhowError, Result};
use url::{ParseError, Url};

const REPLACEMENT_TOKEN: &str = "*";

/// URL that hides its credentials, path and query when printed.
///
/// The path of a parsed URL always ends with a slash so that request paths can be joined to it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RedactingUrl {
    url: Url,
}

impl Display for RedactingUrl {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        match self.redacted() {
            Ok(url) => write!(formatter, "{url}"),
            Err(error) => write!(formatter, "unsanitizable URL: {error}"),
        }
    }
}

impl Debug for RedactingUrl {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        Debug::fmt(self.to_string().as_str(), formatter)
    }
}

impl FromStr for RedactingUrl {
    type Err = ParseError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let mut url = string.parse::<Url>()?;

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self { url })
    }
}

impl RedactingUrl {
    /// Resolves `path` below the path of this URL, even if `path` starts with a slash.
    pub fn join(&self, path: &str) -> Result<Url, ParseError> {
        self.url.join(path.trim_start_matches('/'))
    }

    #[must_use]
    pub fn host_str(&self) -> Option<&str> {
        self.url.host_str()
    }

    fn redacted(&self) -> Result<Url> {
        let mut url = self.url.clone();

        if !url.username().is_empty() {
            url.set_username(REPLACEMENT_TOKEN)
                .map_err(|()| anyhow!("failed to sanitize URL username"))?;
        }

        if url.password().is_some() {
            url.set_password(Some(REPLACEMENT_TOKEN))
                .map_err(|()| anyhow!("failed to sanitize URL password"))?;
        }

        if url.path() != "/" {
            url.set_path(REPLACEMENT_TOKEN);
        }

        if url.query().is_some() {
            url.set_query(Some(REPLACEMENT_TOKEN));
        }

        url.set_fragment(None);

        Ok(url)
    }
}

/// Beacon node to score, written as `label/url` on the command line.
///
/// The label defaults to the host name. URLs without a scheme are assumed to use HTTP.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BeaconEndpoint {
    pub label: String,
    pub url: RedactingUrl,
}

impl Display for BeaconEndpoint {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        write!(formatter, "{} ({})", self.label, self.url)
    }
}

impl FromStr for BeaconEndpoint {
    type Err = AnyhowError;

    fn from_str(string: &str) -> Result<Self> {
        let string = string.trim();

        let (label, address) = match string.split_once('/') {
            Some((label, address)) if !label.contains(':') => (Some(label), address),
            _ => (None, string),
        };

        let url = if address.contains("://") {
            address.parse::<RedactingUrl>()
        } else {
            format!("http://{address}").parse()
        }
        .with_context(|| format!("invalid beacon node URL in {string:?}"))?;

        let label = match label {
            Some(label) => label.to_owned(),
            None => url
                .host_str()
                .with_context(|| format!("beacon node URL in {string:?} has no host"))?
                .to_owned(),
        };

        ensure!(!label.is_empty(), "beacon node label in {string:?} is empty");

        Ok(Self { label, url })
    }
}
