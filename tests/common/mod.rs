#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use dockhand::error::{DeployError, DeployResult};
use dockhand::remote::Remote;

/// One thing the code under test asked the host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exec(String),
    Write {
        path: String,
        content: String,
        privileged: bool,
    },
    Sync {
        local: PathBuf,
        remote_dir: String,
        excludes: Vec<String>,
        delete: bool,
    },
}

/// Facts reported by the state probe, rendered as its `key=value`
/// lines.
#[derive(Debug, Clone)]
pub struct Probe {
    pub pkg: &'static str,
    pub installed: bool,
    pub active: bool,
    pub nginx_active: bool,
    pub container: bool,
    pub running: u32,
    pub proxy_conf: bool,
    pub deploy_dir: bool,
}

impl Probe {
    /// A host with apt-get and nothing else.
    pub fn fresh() -> Self {
        Self {
            pkg: "apt",
            installed: false,
            active: false,
            nginx_active: false,
            container: false,
            running: 0,
            proxy_conf: false,
            deploy_dir: false,
        }
    }

    /// Docker, Compose and Nginx installed and running.
    pub fn ready() -> Self {
        Self {
            installed: true,
            active: true,
            nginx_active: true,
            ..Self::fresh()
        }
    }

    pub fn render(&self) -> String {
        let b = |v: bool| u8::from(v);
        format!(
            "pkg={}\ndocker={}\ncompose={}\nnginx={}\ndocker_active={}\n\
             nginx_active={}\ncontainer={}\nrunning={}\nproxy_conf={}\ndeploy_dir={}\n",
            self.pkg,
            b(self.installed),
            b(self.installed),
            b(self.installed),
            b(self.active),
            b(self.nginx_active),
            b(self.container),
            self.running,
            b(self.proxy_conf),
            b(self.deploy_dir),
        )
    }
}

enum Reply {
    Output(String),
    Fail,
}

/// In-memory host. Records every call and answers from canned
/// replies matched by substring, first match wins. Anything
/// unmatched succeeds with empty output.
pub struct ScriptedRemote {
    sudo: &'static str,
    reachable: bool,
    probes: Vec<String>,
    probes_taken: Cell<usize>,
    rules: Vec<(String, Reply)>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedRemote {
    /// Reachable root host answering every probe with `probe`.
    pub fn new(probe: &Probe) -> Self {
        Self {
            sudo: "",
            reachable: true,
            probes: vec![probe.render()],
            probes_taken: Cell::new(0),
            rules: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Answer successive probes in order, repeating the last one.
    pub fn probes(mut self, probes: &[Probe]) -> Self {
        self.probes = probes.iter().map(Probe::render).collect();
        self
    }

    pub fn non_root(mut self) -> Self {
        self.sudo = "sudo -n ";
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn on(mut self, pattern: &str, output: &str) -> Self {
        self.rules
            .push((pattern.to_string(), Reply::Output(output.to_string())));
        self
    }

    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.rules.push((pattern.to_string(), Reply::Fail));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Commands passed to `exec`, probes excluded.
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Exec(cmd) if !is_probe(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.position(pattern).is_some()
    }

    /// Index in the call log of the first command containing
    /// `pattern`.
    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.calls
            .borrow()
            .iter()
            .position(|c| matches!(c, Call::Exec(cmd) if !is_probe(cmd) && cmd.contains(pattern)))
    }

    /// Index in the call log of the first write to `path`.
    pub fn write_position(&self, path: &str) -> Option<usize> {
        self.calls
            .borrow()
            .iter()
            .position(|c| matches!(c, Call::Write { path: p, .. } if p == path))
    }

    pub fn written(&self, path: &str) -> Option<String> {
        self.calls.borrow().iter().find_map(|c| match c {
            Call::Write {
                path: p, content, ..
            } if p == path => Some(content.clone()),
            _ => None,
        })
    }

    pub fn probe_count(&self) -> usize {
        self.probes_taken.get()
    }

    fn next_probe(&self) -> String {
        let taken = self.probes_taken.get();
        self.probes_taken.set(taken + 1);
        let index = taken.min(self.probes.len() - 1);
        self.probes[index].clone()
    }
}

fn is_probe(command: &str) -> bool {
    command.contains("echo pkg=")
}

impl Remote for ScriptedRemote {
    fn describe(&self) -> String {
        "tester@scripted".to_string()
    }

    fn sudo(&self) -> &'static str {
        self.sudo
    }

    fn check_connection(&self) -> DeployResult<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(DeployError::SshFailed("tester@scripted unreachable".into()))
        }
    }

    fn exec(&self, command: &str) -> DeployResult<String> {
        self.calls.borrow_mut().push(Call::Exec(command.to_string()));

        if is_probe(command) {
            return Ok(self.next_probe());
        }
        for (pattern, reply) in &self.rules {
            if command.contains(pattern.as_str()) {
                return match reply {
                    Reply::Output(out) => Ok(out.clone()),
                    Reply::Fail => Err(DeployError::Other(format!("scripted failure: {pattern}"))),
                };
            }
        }
        Ok(String::new())
    }

    fn write_file(&self, content: &str, remote_path: &str, privileged: bool) -> DeployResult<()> {
        self.calls.borrow_mut().push(Call::Write {
            path: remote_path.to_string(),
            content: content.to_string(),
            privileged,
        });
        Ok(())
    }

    fn sync_dir(
        &self,
        local_dir: &Path,
        remote_dir: &str,
        excludes: &[&str],
        delete: bool,
    ) -> DeployResult<()> {
        self.calls.borrow_mut().push(Call::Sync {
            local: local_dir.to_path_buf(),
            remote_dir: remote_dir.to_string(),
            excludes: excludes.iter().map(|e| (*e).to_string()).collect(),
            delete,
        });
        Ok(())
    }
}
