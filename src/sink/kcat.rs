//! kcat invocation: `kcat -P ... -K:` reading `key:value` lines from stdin.
use crate::config::DEFAULT_BROKERS;
use crate::sink::process::ProcessConnector;
use crate::wire::KEY_DELIMITER;

pub const DEFAULT_PROGRAM: &str = "kcat";
pub const DEFAULT_COMPRESSION: &str = "zstd";

/// librdkafka tuning passed with `-X` unless overridden.
pub const DEFAULT_PROPERTIES: &[(&str, &str)] = &[
    ("batch.size", "1048576"),
    ("batch.num.messages", "1000"),
    ("linger.ms", "1000"),
    ("socket.timeout.ms", "299999"),
];

#[derive(Clone, Debug)]
pub struct KcatOptions {
    pub program: String,
    pub brokers: String,
    pub topic: String,
    pub compression: String,
    /// User `-X` properties; replace a default with the same key, otherwise appended.
    pub properties: Vec<(String, String)>,
}

impl Default for KcatOptions {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            brokers: DEFAULT_BROKERS.to_string(),
            topic: String::new(),
            compression: DEFAULT_COMPRESSION.to_string(),
            properties: Vec::new(),
        }
    }
}

impl KcatOptions {
    /// Effective `-X` properties in order: defaults first, then user additions.
    pub fn effective_properties(&self) -> Vec<(String, String)> {
        let mut props: Vec<(String, String)> = DEFAULT_PROPERTIES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (k, v) in &self.properties {
            match props.iter_mut().find(|(dk, _)| dk == k) {
                Some(slot) => slot.1 = v.clone(),
                None => props.push((k.clone(), v.clone())),
            }
        }
        props
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-P".to_string(), "-b".to_string(), self.brokers.clone()];
        for (k, v) in self.effective_properties() {
            args.push("-X".to_string());
            args.push(format!("{}={}", k, v));
        }
        args.extend([
            "-t".to_string(),
            self.topic.clone(),
            "-z".to_string(),
            self.compression.clone(),
            format!("-K{}", KEY_DELIMITER as char),
        ]);
        args
    }

    pub fn connector(&self) -> ProcessConnector {
        ProcessConnector::new(self.program.clone(), self.args())
    }
}

/// Parse a `key=value` property as given on the command line.
pub fn parse_property(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}
