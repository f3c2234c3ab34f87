use log::{debug, error};
use std::io;
use std::time::Instant;
use tokio::process::Command;

/// A named leaf in the sysctl tree, value kept as the string `sysctl(8)`
/// reported. Numeric leaves are parsed at the point of use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysctlLeaf {
    pub name: String,
    pub value: String,
}

/// Access to the OS sensor namespace.
///
/// The production implementation is [`SysctlTree`]; tests substitute an
/// in-memory tree. Point reads return `None` for any absent or unreadable
/// leaf; a transiently unreadable sensor is indistinguishable from a
/// missing one, and the pollers treat both as a per-cycle error.
#[allow(async_fn_in_trait)]
pub trait SensorTree {
    /// List every leaf below `root`, with values.
    async fn enumerate(&self, root: &str) -> io::Result<Vec<SysctlLeaf>>;

    /// Read a single integer leaf by exact name.
    async fn read_value(&self, key: &str) -> Option<i64>;
}

/// Reads the tree by shelling out to `sysctl(8)`.
///
/// ## Commands used
///
/// - Enumeration: `sysctl <root>`, one `name: value` line per leaf. An
///   unknown root makes `sysctl` exit non-zero, which maps to an empty
///   listing rather than an error.
/// - Point read: `sysctl -n <key>`, bare value on stdout.
#[derive(Debug, Default)]
pub struct SysctlTree;

impl SysctlTree {
    pub fn new() -> Self {
        Self
    }
}

impl SensorTree for SysctlTree {
    async fn enumerate(&self, root: &str) -> io::Result<Vec<SysctlLeaf>> {
        let start = Instant::now();
        let output = Command::new("sysctl").arg(root).output().await?;
        let leaves = if output.status.success() {
            parse_leaves(&String::from_utf8_lossy(&output.stdout))
        } else {
            debug!(
                "sysctl {} exited with {}: {}",
                root,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            Vec::new()
        };
        debug!("sysctl enumerate took: {} ms", start.elapsed().as_millis());
        Ok(leaves)
    }

    async fn read_value(&self, key: &str) -> Option<i64> {
        let start = Instant::now();
        let result = match Command::new("sysctl").args(["-n", key]).output().await {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .trim()
                .parse::<i64>()
                .ok(),
            Ok(output) => {
                debug!("sysctl -n {} exited with {}", key, output.status);
                None
            }
            Err(e) => {
                error!("Failed to execute sysctl: {}", e);
                None
            }
        };
        debug!("sysctl read_value took: {} ms", start.elapsed().as_millis());
        result
    }
}

/// Split `name: value` lines as printed by `sysctl(8)`. Lines without a
/// separator (continuation lines of multi-line values) are skipped.
fn parse_leaves(output: &str) -> Vec<SysctlLeaf> {
    output
        .lines()
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some(SysctlLeaf {
                name: name.trim().to_string(),
                value: value.trim().to_string(),
            })
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leaves() {
        let output = "dev.gpioths.0.temperature: 2985\n\
                      dev.gpioths.0.humidity: 60\n\
                      dev.gpioths.0.%desc: DHT22 temperature and humidity sensor\n";
        let leaves = parse_leaves(output);
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[0].name, "dev.gpioths.0.temperature");
        assert_eq!(leaves[0].value, "2985");
        assert_eq!(
            leaves[2],
            SysctlLeaf {
                name: "dev.gpioths.0.%desc".to_string(),
                value: "DHT22 temperature and humidity sensor".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_leaves_skips_separator_less_lines() {
        let leaves = parse_leaves("no separator here\ndev.gpioths.0.humidity: 60\n");
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].name, "dev.gpioths.0.humidity");
    }

    #[tokio::test]
    async fn test_fake_tree_point_read() {
        let mut tree = testing::FakeTree::default();
        tree.insert("dev.gpioths.0.temperature", "2985");
        assert_eq!(tree.read_value("dev.gpioths.0.temperature").await, Some(2985));
        assert_eq!(tree.read_value("dev.gpioths.0.humidity").await, None);
    }
}
