//! Runtime control and the per-cycle tick driver.
//!
//! Batch operations never trust the caller's ordering: enabling walks the
//! scheme's forward control order restricted to the requested names, so
//! upstream blocks start before their consumers; disabling walks the
//! reverse order. `switch_blocks` combines its two halves without
//! short-circuiting so the enable half always runs.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

use bf_core::{BlockId, Layer};
use tracing::{error, info};

use crate::error::{SchemeError, SchemeResult};
use crate::scheme::Scheme;

impl Scheme {
    /// Start a block. A running conflicting block fails the request unless
    /// `force` is set, in which case the conflict is disabled first.
    pub fn enable_block(&mut self, name: &str, force: bool) -> bool {
        let id = BlockId::from(name);
        match self.try_enable(&id, force) {
            Ok(()) => true,
            Err(err) => {
                error!(block = %id, %err, "enableBlock failed");
                false
            }
        }
    }

    /// Stop a block. A block that is not running is a no-op success.
    pub fn disable_block(&mut self, name: &str) -> bool {
        let id = BlockId::from(name);
        match self.try_disable(&id) {
            Ok(()) => true,
            Err(err) => {
                error!(block = %id, %err, "disableBlock failed");
                false
            }
        }
    }

    /// Enable a set of blocks in the scheme's forward execution order.
    /// `strict` stops at the first failure; otherwise all blocks are
    /// attempted and the results combined.
    pub fn enable_blocks<S: AsRef<str>>(&mut self, names: &[S], strict: bool, force: bool) -> bool {
        let ordered = self.forward_order(names);
        let mut success = true;
        for name in &ordered {
            success &= self.enable_block(name.as_str(), force);
            if !success && strict {
                return false;
            }
        }
        success
    }

    /// Same as [`Scheme::enable_blocks`]; the name documents that the
    /// caller's ordering is always discarded in favour of the topological
    /// one.
    pub fn enable_blocks_topo<S: AsRef<str>>(
        &mut self,
        names: &[S],
        strict: bool,
        force: bool,
    ) -> bool {
        self.enable_blocks(names, strict, force)
    }

    /// Disable a set of blocks in the scheme's reverse execution order.
    pub fn disable_blocks<S: AsRef<str>>(&mut self, names: &[S], strict: bool) -> bool {
        let ordered = self.reverse_order(names);
        let mut success = true;
        for name in &ordered {
            success &= self.disable_block(name.as_str());
            if !success && strict {
                return false;
            }
        }
        success
    }

    /// Disable one set of blocks, then enable another. Disabling first lets
    /// `force` take over freed exclusive inputs. The halves are combined
    /// with `&` so the enable half runs even when disabling reported
    /// failure.
    pub fn switch_blocks<S: AsRef<str>, T: AsRef<str>>(
        &mut self,
        disable: &[S],
        enable: &[T],
        strict: bool,
        force: bool,
    ) -> bool {
        self.disable_blocks(disable, strict) & self.enable_blocks(enable, strict, force)
    }

    /// Make `enabled` the exact set of running blocks: everything else is
    /// disabled.
    pub fn set_blocks<S: AsRef<str>>(&mut self, enabled: &[S], strict: bool) -> bool {
        let all = self.get_blocks();
        self.switch_blocks(&all, enabled, strict, false)
    }

    /// Execute one cycle at monotonic time `now`.
    ///
    /// Both layers are walked in their published order, estimation first.
    /// A block runs iff it is `Running` and its layer period has elapsed
    /// since its last execution; the same `now` is used for every block so
    /// co-periodic blocks observe the same timestamp. A panicking hook is
    /// logged, the block is stopped, and the walk continues.
    pub fn update(&mut self, now: Duration) {
        let time = now.as_secs_f64();
        for layer in Layer::ALL {
            let ordering = self.layers.get(layer).ordering.clone();
            for name in &ordering {
                let Some(entry) = self.blocks.get_mut(name) else {
                    continue;
                };
                let handle = Rc::clone(&entry.handle);
                let elapsed = now.saturating_sub(*entry.last_exec.get(layer));
                {
                    let block = handle.borrow();
                    if !block.state().is_running() || elapsed < block.period(layer) {
                        continue;
                    }
                }

                let dt = elapsed.as_secs_f64();
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    let mut block = handle.borrow_mut();
                    match layer {
                        Layer::Estimation => {
                            block.read_hardware(time, dt);
                            block.compute_estimation(time, dt);
                        }
                        Layer::Control => {
                            block.compute_control(time, dt);
                            block.write_hardware(time, dt);
                        }
                    }
                }));

                match outcome {
                    Ok(()) => {
                        *entry.last_exec.get_mut(layer) = now;
                    }
                    Err(_) => {
                        error!(block = %name, %layer, "hook panicked; stopping block");
                        if !handle.borrow_mut().stop() {
                            error!(block = %name, "could not stop block after panic");
                        }
                    }
                }
            }
        }
    }

    fn try_enable(&mut self, name: &BlockId, force: bool) -> SchemeResult<()> {
        let entry = self
            .blocks
            .get(name)
            .ok_or_else(|| SchemeError::UnknownBlock { name: name.clone() })?;
        if !entry.handle.borrow().is_configured() {
            return Err(SchemeError::BlockNotConfigured { name: name.clone() });
        }

        for conflict in self.conflicts.conflicts_of(name) {
            let running = self
                .blocks
                .get(&conflict)
                .map(|e| e.handle.borrow().state().is_running())
                .unwrap_or(false);
            if !running {
                continue;
            }
            if force {
                info!(block = %name, conflict = %conflict, "force-enable disables conflicting block");
                self.try_disable(&conflict)?;
            } else {
                return Err(SchemeError::ConflictingBlockRunning {
                    block: name.clone(),
                    conflict,
                });
            }
        }

        let started = self.blocks[name].handle.borrow_mut().start();
        if !started {
            return Err(SchemeError::StartFailure { name: name.clone() });
        }
        Ok(())
    }

    fn try_disable(&mut self, name: &BlockId) -> SchemeResult<()> {
        let entry = self
            .blocks
            .get(name)
            .ok_or_else(|| SchemeError::UnknownBlock { name: name.clone() })?;
        let running = entry.handle.borrow().state().is_running();
        if running && !entry.handle.borrow_mut().stop() {
            return Err(SchemeError::StopFailure { name: name.clone() });
        }
        Ok(())
    }

    fn forward_order<S: AsRef<str>>(&self, names: &[S]) -> Vec<BlockId> {
        let ids: Vec<BlockId> = names.iter().map(|n| BlockId::from(n.as_ref())).collect();
        self.layers.get(Layer::Control).index.sort_forward(&ids)
    }

    fn reverse_order<S: AsRef<str>>(&self, names: &[S]) -> Vec<BlockId> {
        let ids: Vec<BlockId> = names.iter().map(|n| BlockId::from(n.as_ref())).collect();
        self.layers.get(Layer::Control).index.sort_reverse(&ids)
    }
}
