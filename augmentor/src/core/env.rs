//! Environment-variable resolution for the inference launch.
//!
//! The launch contract is "use the existing value if set, else the literal
//! default". Values are passed through to the external program unvalidated: a
//! malformed `NUM_GPU` reaches the launcher unchanged and fails there, not
//! here.

use std::collections::HashMap;
use std::path::Path;

pub const CUDA_VISIBLE_DEVICES: &str = "CUDA_VISIBLE_DEVICES";
pub const CHECKPOINT_DIR: &str = "CHECKPOINT_DIR";
pub const NUM_GPU: &str = "NUM_GPU";

pub const DEFAULT_CUDA_VISIBLE_DEVICES: &str = "0";
pub const DEFAULT_CHECKPOINT_DIR: &str = "./checkpoints";
pub const DEFAULT_NUM_GPU: &str = "1";

/// Resolved launch environment.
///
/// All fields are strings: `NUM_GPU` is an integer by convention only, and the
/// external launcher is the one that enforces that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEnv {
    pub cuda_visible_devices: String,
    pub checkpoint_dir: String,
    pub num_gpu: String,
}

impl LaunchEnv {
    /// Resolve the three launch variables from a snapshot of environment
    /// variables, substituting defaults for anything unset.
    pub fn resolve(vars: &HashMap<String, String>) -> Self {
        let get = |key: &str, default: &str| {
            vars.get(key)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            cuda_visible_devices: get(CUDA_VISIBLE_DEVICES, DEFAULT_CUDA_VISIBLE_DEVICES),
            checkpoint_dir: get(CHECKPOINT_DIR, DEFAULT_CHECKPOINT_DIR),
            num_gpu: get(NUM_GPU, DEFAULT_NUM_GPU),
        }
    }

    /// Resolve from the current process environment.
    pub fn from_process_env() -> Self {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::resolve(&vars)
    }

    /// Full child environment for the inference process.
    ///
    /// On top of the three resolved variables, the launch always sets the CUDA
    /// allocator/debug knobs the inference stack expects and points
    /// `PYTHONPATH` at the launcher working directory so the entry-point
    /// module resolves.
    pub fn child_env(&self, workdir: &Path) -> Vec<(String, String)> {
        vec![
            (
                CUDA_VISIBLE_DEVICES.to_string(),
                self.cuda_visible_devices.clone(),
            ),
            (CHECKPOINT_DIR.to_string(), self.checkpoint_dir.clone()),
            (NUM_GPU.to_string(), self.num_gpu.clone()),
            (
                "PYTORCH_CUDA_ALLOC_CONF".to_string(),
                "expandable_segments:True".to_string(),
            ),
            ("CUDA_LAUNCH_BLOCKING".to_string(), "1".to_string()),
            ("PYTHONPATH".to_string(), workdir.display().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn unset_variables_take_defaults() {
        let env = LaunchEnv::resolve(&HashMap::new());
        assert_eq!(env.cuda_visible_devices, "0");
        assert_eq!(env.checkpoint_dir, "./checkpoints");
        assert_eq!(env.num_gpu, "1");
    }

    #[test]
    fn set_variables_pass_through_unmodified() {
        let vars: HashMap<String, String> = [
            (CUDA_VISIBLE_DEVICES.to_string(), "0,1".to_string()),
            (CHECKPOINT_DIR.to_string(), "/mnt/ckpts".to_string()),
            (NUM_GPU.to_string(), "8".to_string()),
        ]
        .into_iter()
        .collect();

        let env = LaunchEnv::resolve(&vars);
        assert_eq!(env.cuda_visible_devices, "0,1");
        assert_eq!(env.checkpoint_dir, "/mnt/ckpts");
        assert_eq!(env.num_gpu, "8");
    }

    #[test]
    fn malformed_values_are_not_validated() {
        let vars: HashMap<String, String> =
            [(NUM_GPU.to_string(), "not-a-number".to_string())]
                .into_iter()
                .collect();
        let env = LaunchEnv::resolve(&vars);
        assert_eq!(env.num_gpu, "not-a-number");
    }

    #[test]
    fn child_env_carries_fixed_entries() {
        let env = LaunchEnv::resolve(&HashMap::new());
        let child = env.child_env(&PathBuf::from("/opt/inference"));
        let lookup = |key: &str| {
            child
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(lookup("PYTHONPATH"), Some("/opt/inference"));
        assert_eq!(lookup("CUDA_LAUNCH_BLOCKING"), Some("1"));
        assert_eq!(
            lookup("PYTORCH_CUDA_ALLOC_CONF"),
            Some("expandable_segments:True")
        );
        assert_eq!(lookup(NUM_GPU), Some("1"));
    }
}
