//! Test-only scripted backends for launch and prompt generation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::io::describe::PromptSource;
use crate::launch::{LaunchOutcome, LaunchPlan, Launcher};

/// One scripted launch response.
#[derive(Debug, Clone)]
pub struct ScriptedLaunch {
    pub exit_code: i32,
    /// Write the expected `<stem>.mp4` into the save folder, as the external
    /// program would on success.
    pub write_output: bool,
}

impl ScriptedLaunch {
    pub fn ok() -> Self {
        Self {
            exit_code: 0,
            write_output: true,
        }
    }

    pub fn failing(exit_code: i32) -> Self {
        Self {
            exit_code,
            write_output: false,
        }
    }
}

/// Launcher that replays a queue of scripted responses and records the plans
/// it was asked to run.
pub struct ScriptedLauncher {
    script: RefCell<VecDeque<ScriptedLaunch>>,
    pub plans: RefCell<Vec<LaunchPlan>>,
}

impl ScriptedLauncher {
    pub fn new(script: Vec<ScriptedLaunch>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            plans: RefCell::new(Vec::new()),
        }
    }
}

impl Launcher for ScriptedLauncher {
    fn launch(&self, plan: &LaunchPlan) -> Result<LaunchOutcome> {
        let scripted = self
            .script
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted launch left"))?;
        self.plans.borrow_mut().push(plan.clone());

        if scripted.write_output
            && let Some(stem) = &plan.invocation.video_save_name
        {
            let folder = &plan.invocation.video_save_folder;
            fs::create_dir_all(folder)
                .with_context(|| format!("create save folder {}", folder.display()))?;
            let path = folder.join(format!("{stem}.mp4"));
            fs::write(&path, b"synthetic video stub")
                .with_context(|| format!("write {}", path.display()))?;
        }

        Ok(LaunchOutcome {
            exit_code: scripted.exit_code,
            timed_out: false,
        })
    }
}

/// Prompt source returning one fixed prompt, without probing or network use.
pub struct FixedPrompts(pub String);

impl PromptSource for FixedPrompts {
    fn prompt_for(&self, _video: &Path) -> String {
        self.0.clone()
    }
}
