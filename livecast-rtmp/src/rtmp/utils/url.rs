use {
    super::errors::{RtmpUrlParseError, RtmpUrlParseErrorValue},
    std::fmt,
};

pub const DEFAULT_RTMP_PORT: u16 = 1935;

/// A publish target: `rtmp://host[:port]/app[/more]/stream[?query]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtmpUrl {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Application name, every path segment but the last.
    pub app: String,
    /// Stream name sent in `releaseStream`, `FCPublish` and `publish`.
    pub play_path: String,
    pub tc_url: String,
}

impl RtmpUrl {
    /// Parse a url whose last path segment is the stream name.
    pub fn parse(raw_url: &str) -> Result<Self, RtmpUrlParseError> {
        Self::parse_inner(raw_url, None)
    }

    /// Parse a server url and a separately supplied stream key. The whole
    /// path is the application and the key becomes the play path.
    pub fn with_stream_key(raw_url: &str, stream_key: &str) -> Result<Self, RtmpUrlParseError> {
        Self::parse_inner(raw_url, Some(stream_key))
    }

    fn parse_inner(raw_url: &str, stream_key: Option<&str>) -> Result<Self, RtmpUrlParseError> {
        let parsed = url::Url::parse(raw_url.trim())?;

        let scheme = parsed.scheme().to_string();
        if scheme != "rtmp" {
            return Err(RtmpUrlParseErrorValue::UnsupportedScheme(scheme).into());
        }

        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or(RtmpUrlParseErrorValue::MissingHost)?
            .to_string();
        let explicit_port = parsed.port();
        let port = explicit_port.unwrap_or(DEFAULT_RTMP_PORT);

        let mut segments: Vec<&str> = parsed
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        let query = parsed.query().map(|query| format!("?{query}")).unwrap_or_default();

        let stream_name = match stream_key.map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            Some(_) => return Err(RtmpUrlParseErrorValue::MissingStreamName.into()),
            None => {
                if segments.len() < 2 {
                    return Err(RtmpUrlParseErrorValue::MissingStreamName.into());
                }
                segments.pop().unwrap_or_default().to_string()
            }
        };

        if segments.is_empty() {
            return Err(RtmpUrlParseErrorValue::MissingApp.into());
        }
        let app = segments.join("/");

        let tc_url = match explicit_port {
            Some(port) => format!("{scheme}://{host}:{port}/{app}"),
            None => format!("{scheme}://{host}/{app}"),
        };

        Ok(Self {
            scheme,
            host,
            port,
            app,
            play_path: format!("{stream_name}{query}"),
            tc_url,
        })
    }
}

impl fmt::Display for RtmpUrl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.tc_url, self.play_path)
    }
}

#[cfg(test)]
mod tests {
    use super::RtmpUrl;

    #[test]
    fn test_app_and_instance() {
        let url = RtmpUrl::parse("rtmp://live.example.com/live/abc123").unwrap();
        assert_eq!(url.host, "live.example.com");
        assert_eq!(url.port, 1935);
        assert_eq!(url.app, "live");
        assert_eq!(url.play_path, "abc123");
        assert_eq!(url.tc_url, "rtmp://live.example.com/live");
    }

    #[test]
    fn test_nested_app_port_and_query() {
        let url = RtmpUrl::parse("rtmp://10.0.0.2:1936/app/inst/key?token=x1").unwrap();
        assert_eq!(url.port, 1936);
        assert_eq!(url.app, "app/inst");
        assert_eq!(url.play_path, "key?token=x1");
        assert_eq!(url.tc_url, "rtmp://10.0.0.2:1936/app/inst");
        assert_eq!(url.to_string(), "rtmp://10.0.0.2:1936/app/inst/key?token=x1");
    }

    #[test]
    fn test_separate_stream_key() {
        let url = RtmpUrl::with_stream_key("rtmp://a.rtmp.youtube.com/live2", "xxxx-yyyy").unwrap();
        assert_eq!(url.app, "live2");
        assert_eq!(url.play_path, "xxxx-yyyy");

        assert!(RtmpUrl::with_stream_key("rtmp://host/live", "  ").is_err());
        assert!(RtmpUrl::with_stream_key("rtmp://host", "key").is_err());
    }

    #[test]
    fn test_invalid_urls() {
        assert!(RtmpUrl::parse("not a url").is_err());
        assert!(RtmpUrl::parse("http://host/live/key").is_err());
        assert!(RtmpUrl::parse("rtmp://host/live").is_err());
        assert!(RtmpUrl::parse("rtmp:///live/key").is_err());
    }
}
