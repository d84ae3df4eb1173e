//! The transcoder host: endpoints, machines, warmup and the main loop.
//!
//! Machine construction is direction-explicit: the forward lane reads DMR
//! and P25 traffic from the source endpoint and writes the transcoded result
//! to the destination; two-way mode instantiates the mirror lane. Each lane
//! owns its machines and each machine its codec pair, so the single loop
//! task is the only thing that ever touches shared state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossmode_core::{
    CallConfig, DmrSlot, P25Call, SlotConfig, TranscodeAction, VoiceBridge,
};
use crossmode_proto::fne::PeerMetadata;

use crate::config::Config;
use crate::error::HostError;
use crate::network::{FneNetwork, NetworkConfig};

/// Link warmup ahead of transcoding, so the masters reach `Running` first.
const WARMUP_MS: u32 = 15_000;

/// Ticks faster than this sleep a millisecond.
const MIN_TICK_MS: u32 = 2;

/// One transcoding direction: two DMR slot machines and a P25 call machine
/// reading from one endpoint and writing to the other.
struct Lane {
    dmr_slot1: DmrSlot,
    dmr_slot2: DmrSlot,
    p25_call: P25Call,
}

impl Lane {
    fn new(config: &Config) -> Self {
        let slot_config = SlotConfig {
            timeout_secs: config.system.timeout,
            jitter_ms: config.network.jitter,
        };
        let call_config =
            CallConfig { timeout_secs: config.system.timeout, ..CallConfig::default() };
        let gain = config.system.gain_adjust;
        Self {
            dmr_slot1: DmrSlot::new(1, slot_config, VoiceBridge::null(gain)),
            dmr_slot2: DmrSlot::new(2, slot_config, VoiceBridge::null(gain)),
            p25_call: P25Call::new(call_config, VoiceBridge::null(gain)),
        }
    }

    /// Drain one frame per protocol from `from`, advance every machine, and
    /// write the produced frames to `to`.
    fn pump(&mut self, from: &mut FneNetwork, to: &mut FneNetwork, ms: u32) {
        if let Some(frame) = from.read_dmr() {
            let actions = match frame.slot_no {
                1 => self.dmr_slot1.process(&frame),
                2 => self.dmr_slot2.process(&frame),
                other => {
                    tracing::error!("DMR, invalid slot, slotNo = {other}");
                    Vec::new()
                },
            };
            execute(actions, to);
        }
        if let Some(record) = from.read_p25() {
            execute(self.p25_call.process(&record), to);
        }

        execute(self.dmr_slot1.tick(ms), to);
        execute(self.dmr_slot2.tick(ms), to);
        execute(self.p25_call.tick(ms), to);
    }
}

/// Write a batch of machine actions to the destination endpoint.
fn execute(actions: Vec<TranscodeAction>, to: &mut FneNetwork) {
    for action in actions {
        match action {
            TranscodeAction::SendDmr(frame) => to.write_dmr(&frame),
            TranscodeAction::SendP25Ldu1 { context, ldu } => to.write_p25_ldu1(&context, &ldu),
            TranscodeAction::SendP25Ldu2 { context, ldu } => to.write_p25_ldu2(&context, &ldu),
            TranscodeAction::SendP25Tdu { context } => to.write_p25_tdu(&context),
        }
    }
}

/// The transcoder host.
pub struct Host {
    config: Config,
}

impl Host {
    /// Build a host from its parsed configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the warmup phase and the main processing loop until a signal
    /// arrives.
    pub async fn run(&mut self) -> Result<(), HostError> {
        let config = self.config.clone();

        tracing::info!("General parameters");
        tracing::info!("    Timeout: {}s", config.system.timeout);
        tracing::info!("    Identity: {}", config.system.identity);
        tracing::info!(
            "    Two-way transcode: {}",
            if config.system.two_way_transcode { "enabled" } else { "disabled" }
        );
        tracing::info!("    DMR jitter: {}ms", config.network.jitter);
        if config.system.verbose {
            tracing::info!("    Verbose: yes");
        }
        if config.system.debug {
            tracing::info!("    Debug: yes");
        }

        let metadata = PeerMetadata {
            identity: config.system.identity.clone(),
            latitude: config.system.info.latitude,
            longitude: config.system.info.longitude,
            height: config.system.info.height,
            location: config.system.info.location.clone(),
            power: config.system.info.power,
            ..PeerMetadata::default()
        };

        tracing::info!("Source network: {}:{}", config.src_network.address, config.src_network.port);
        let mut src =
            FneNetwork::new(NetworkConfig::from(&config.src_network), metadata.clone())?;
        src.open().await?;
        src.set_enabled(true);

        tracing::info!(
            "Destination network: {}:{}",
            config.dst_network.address,
            config.dst_network.port
        );
        let mut dst = FneNetwork::new(NetworkConfig::from(&config.dst_network), metadata)?;
        dst.open().await?;
        dst.set_enabled(true);

        let mut forward = Lane::new(&config);
        let mut reverse =
            if config.system.two_way_transcode { Some(Lane::new(&config)) } else { None };

        let killed = Arc::new(AtomicBool::new(false));
        {
            let killed = Arc::clone(&killed);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    killed.store(true, Ordering::Relaxed);
                }
            });
        }

        tracing::info!("Host is performing late initialization and warmup");
        let mut stopwatch = Instant::now();
        let mut warmed_ms = 0u32;
        while !killed.load(Ordering::Relaxed) && warmed_ms < WARMUP_MS {
            let ms = stopwatch.elapsed().as_millis() as u32;
            stopwatch = Instant::now();
            warmed_ms = warmed_ms.saturating_add(ms);

            src.tick(ms).await;
            dst.tick(ms).await;

            if ms < MIN_TICK_MS {
                tokio::time::sleep(Duration::from_millis(1)).await;
            } else {
                tokio::task::yield_now().await;
            }
        }

        tracing::info!("Host is up and running");
        stopwatch = Instant::now();

        while !killed.load(Ordering::Relaxed) {
            let ms = stopwatch.elapsed().as_millis() as u32;
            stopwatch = Instant::now();

            forward.pump(&mut src, &mut dst, ms);
            if let Some(reverse) = &mut reverse {
                reverse.pump(&mut dst, &mut src, ms);
            }

            src.tick(ms).await;
            dst.tick(ms).await;

            if ms < MIN_TICK_MS {
                tokio::time::sleep(Duration::from_millis(1)).await;
            } else {
                tokio::task::yield_now().await;
            }
        }

        tracing::info!("Host is shutting down");
        src.close();
        dst.close();
        Ok(())
    }
}
