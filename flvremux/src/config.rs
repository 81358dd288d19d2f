use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemuxConfig {
    /// Capacity of the keyframe index of one file. A full index starts a new file.
    #[serde(default = "default_max_keyframes")]
    pub max_keyframes: u32,
    /// Keyframes closer than this to the last indexed one are not indexed.
    #[serde(default = "default_min_keyframe_interval_ms")]
    pub min_keyframe_interval_ms: i32,
    /// Written as the `Comment` metadata property of every file.
    #[serde(default = "default_comment")]
    pub comment: String,
}

/// Both keyframe arrays together must fit in one script tag.
const MAX_KEYFRAMES_LIMIT: u32 = 500_000;

fn default_max_keyframes() -> u32 {
    6000
}

fn default_min_keyframe_interval_ms() -> i32 {
    2500
}

fn default_comment() -> String {
    format!(
        "created by {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

impl Default for RemuxConfig {
    fn default() -> Self {
        Self {
            max_keyframes: default_max_keyframes(),
            min_keyframe_interval_ms: default_min_keyframe_interval_ms(),
            comment: default_comment(),
        }
    }
}

impl RemuxConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_keyframes == 0 || self.max_keyframes > MAX_KEYFRAMES_LIMIT {
            return Err(anyhow::anyhow!(
                "max_keyframes must be between 1 and {}, got {}",
                MAX_KEYFRAMES_LIMIT,
                self.max_keyframes
            ));
        }
        if self.min_keyframe_interval_ms < 0 {
            return Err(anyhow::anyhow!(
                "min_keyframe_interval_ms must not be negative, got {}",
                self.min_keyframe_interval_ms
            ));
        }
        if self.comment.len() > u16::MAX as usize {
            return Err(anyhow::anyhow!("comment is longer than {} bytes", u16::MAX));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg: RemuxConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.max_keyframes, 6000);
        assert_eq!(cfg.min_keyframe_interval_ms, 2500);
        assert!(cfg.comment.starts_with("created by flvremux v"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let cfg = RemuxConfig {
            max_keyframes: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RemuxConfig {
            min_keyframe_interval_ms: -1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
