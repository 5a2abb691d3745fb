//! Screen capability seam.
//!
//! The engine talks to the display through three narrow traits — [`Locator`],
//! [`Input`] and [`ScreenGrab`] — and the [`ScreenDriver`] facade that owns
//! them. Production wiring uses the template matcher, `enigo` and `xcap`;
//! tests swap in scripted doubles.

pub mod capture;
pub mod driver;
pub mod input;
pub mod locator;

pub use capture::{ScreenGrab, XcapGrab};
pub use driver::ScreenDriver;
pub use input::{EnigoInput, Input, Key};
pub use locator::{Locator, Region, TemplateLocator};

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted capability doubles shared by the engine's unit tests.

    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use super::{Input, Key, Locator, Region, ScreenGrab};

    struct Entry {
        key: String,
        after: usize,
        region: Region,
    }

    /// A locator driven by a script: each asset becomes visible after a fixed
    /// number of observations, or fails outright.
    #[derive(Default)]
    pub struct ScriptedLocator {
        entries: Vec<Entry>,
        counts: Arc<Mutex<HashMap<String, usize>>>,
        fail_all: Option<String>,
        fail_keys: Vec<(String, String)>,
    }

    impl ScriptedLocator {
        pub fn new() -> Self {
            Self::default()
        }

        /// Asset at `key` (a path suffix like `en/save_button.png`) is found
        /// on observation `after + 1` and every observation thereafter.
        pub fn visible_after(mut self, key: &str, after: usize) -> Self {
            let index = self.entries.len() as i32 + 1;
            self.entries.push(Entry {
                key: key.to_string(),
                after,
                region: Region {
                    x: index * 100,
                    y: index * 100,
                    width: 20,
                    height: 10,
                },
            });
            self
        }

        pub fn visible(self, key: &str) -> Self {
            self.visible_after(key, 0)
        }

        /// Every observation fails (capability breakage).
        pub fn failing(mut self, message: &str) -> Self {
            self.fail_all = Some(message.to_string());
            self
        }

        /// Observations of one asset fail (mid-session breakage).
        pub fn fail_on(mut self, key: &str, message: &str) -> Self {
            self.fail_keys.push((key.to_string(), message.to_string()));
            self
        }

        /// Screen coordinates clicks on this asset land at.
        pub fn center_of(&self, key: &str) -> (i32, i32) {
            self.entries
                .iter()
                .find(|e| e.key == key)
                .map(|e| e.region.center())
                .expect("unknown scripted asset")
        }

        /// How many times the asset was observed.
        pub fn observations(&self) -> Arc<Mutex<HashMap<String, usize>>> {
            Arc::clone(&self.counts)
        }
    }

    impl Locator for ScriptedLocator {
        fn find(&mut self, template: &Path, _confidence: f32) -> anyhow::Result<Option<Region>> {
            let path = template.to_string_lossy().replace('\\', "/");
            if let Some(message) = &self.fail_all {
                anyhow::bail!("{message}");
            }
            if let Some((_, message)) = self.fail_keys.iter().find(|(k, _)| path.ends_with(k)) {
                anyhow::bail!("{message}");
            }
            for entry in &self.entries {
                if path.ends_with(&entry.key) {
                    let mut counts = self.counts.lock().unwrap();
                    let seen = counts.entry(entry.key.clone()).or_insert(0);
                    *seen += 1;
                    return Ok((*seen > entry.after).then_some(entry.region));
                }
            }
            Ok(None)
        }
    }

    /// Records every injected event; all injections succeed.
    #[derive(Default)]
    pub struct ScriptedInput {
        clicks: Arc<Mutex<Vec<(i32, i32)>>>,
        keys: Arc<Mutex<Vec<Key>>>,
        scrolls: Arc<Mutex<Vec<i32>>>,
        hotkeys: Arc<Mutex<Vec<Key>>>,
    }

    impl ScriptedInput {
        pub fn clicks(&self) -> Arc<Mutex<Vec<(i32, i32)>>> {
            Arc::clone(&self.clicks)
        }

        pub fn keys(&self) -> Arc<Mutex<Vec<Key>>> {
            Arc::clone(&self.keys)
        }

        pub fn hotkeys(&self) -> Arc<Mutex<Vec<Key>>> {
            Arc::clone(&self.hotkeys)
        }

        pub fn scrolls(&self) -> Arc<Mutex<Vec<i32>>> {
            Arc::clone(&self.scrolls)
        }
    }

    impl Input for ScriptedInput {
        fn click_at(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
            self.clicks.lock().unwrap().push((x, y));
            Ok(())
        }

        fn scroll(&mut self, dy: i32) -> anyhow::Result<()> {
            self.scrolls.lock().unwrap().push(dy);
            Ok(())
        }

        fn press(&mut self, key: Key) -> anyhow::Result<()> {
            self.keys.lock().unwrap().push(key);
            Ok(())
        }

        fn hotkey(&mut self, _modifiers: &[Key], key: Key) -> anyhow::Result<()> {
            self.hotkeys.lock().unwrap().push(key);
            Ok(())
        }
    }

    /// Writes empty files instead of real captures.
    #[derive(Default)]
    pub struct StubGrab {
        saved: Arc<Mutex<Vec<PathBuf>>>,
        pub fail: bool,
    }

    impl StubGrab {
        pub fn saved(&self) -> Arc<Mutex<Vec<PathBuf>>> {
            Arc::clone(&self.saved)
        }
    }

    impl ScreenGrab for StubGrab {
        fn save(&mut self, path: &Path) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("capture unavailable");
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, b"")?;
            self.saved.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        fn screen_size(&mut self) -> anyhow::Result<(u32, u32)> {
            Ok((1920, 1080))
        }
    }
}
