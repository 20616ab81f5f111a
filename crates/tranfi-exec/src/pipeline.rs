//! The pipeline state machine: `Open → Finished → Released`.
//!
//! Data path for every pushed chunk:
//! decoder → batches of `batch_size` rows → operator chain → encoder → main
//! channel. Row-level problems from any stage become JSON lines on the
//! errors channel; only lifecycle violations and lookup/codec failures are
//! returned as `Err`.

use std::time::Instant;

use tranfi_core::config::EngineConfig;
use tranfi_core::error::RowError;
use tranfi_core::hash::Hash256;
use tranfi_core::plan::Plan;
use tranfi_core::row::Row;
use tranfi_io::writers::row_to_json_line;
use tranfi_io::{decoder_for, encoder_for, ChannelBuffer, Decoder, Encoder};
use tranfi_operators::Operator;

use crate::error::{ExecError, Result};
use crate::metrics::emit_span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Open,
    Finished,
    Released,
}

/// Output channel ids are part of the binding ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Main = 0,
    Errors = 1,
    Stats = 2,
    Samples = 3,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Main, Channel::Errors, Channel::Stats, Channel::Samples];

    pub fn from_id(id: u32) -> Result<Channel> {
        match id {
            0 => Ok(Channel::Main),
            1 => Ok(Channel::Errors),
            2 => Ok(Channel::Stats),
            3 => Ok(Channel::Samples),
            other => Err(ExecError::InvalidChannel(other)),
        }
    }

    pub fn id(self) -> u32 {
        self as u32
    }
}

/// Counters reported in the stats block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub rows_in: u64,
    pub rows_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub errors: u64,
}

/// Channels plus the counters that describe what went into them.
#[derive(Default)]
struct Outputs {
    channels: [ChannelBuffer; 4],
    stats: RunStats,
    errors_written: usize,
    samples_written: usize,
    max_errors: usize,
    sample_rows: usize,
}

impl Outputs {
    fn channel(&mut self, ch: Channel) -> &mut ChannelBuffer {
        &mut self.channels[ch as usize]
    }

    /// Every error is counted; only the first `max_errors` are written.
    fn record_errors(&mut self, errors: Vec<RowError>) {
        for e in errors {
            self.stats.errors += 1;
            if self.errors_written < self.max_errors {
                self.errors_written += 1;
                let line = e.to_json_line();
                self.channel(Channel::Errors).write(line.as_bytes());
            }
        }
    }

    fn emit(&mut self, encoder: &mut dyn Encoder, rows: &[Row]) -> Result<()> {
        self.stats.rows_out += rows.len() as u64;

        let want = self.sample_rows.saturating_sub(self.samples_written);
        if want > 0 {
            let mut buf = Vec::new();
            for row in rows.iter().take(want) {
                row_to_json_line(row, &mut buf)?;
                self.samples_written += 1;
            }
            self.channel(Channel::Samples).write(&buf);
        }

        let mut buf = Vec::new();
        encoder.write_rows(rows, &mut buf)?;
        self.write_main(&buf);
        Ok(())
    }

    fn write_main(&mut self, bytes: &[u8]) {
        self.stats.bytes_out += bytes.len() as u64;
        self.channel(Channel::Main).write(bytes);
    }
}

/// Everything that is dropped on release.
struct Chain {
    decoder: Box<dyn Decoder>,
    ops: Vec<Operator>,
    encoder: Box<dyn Encoder>,
    batch_size: usize,
}

impl Chain {
    /// Once any operator is done, nothing upstream can reach the encoder.
    fn short_circuited(&self) -> bool {
        self.ops.iter().any(Operator::is_done)
    }

    /// Feed `rows` through `ops[start..]` and encode what comes out, one
    /// batch at a time.
    fn run_from(&mut self, start: usize, rows: Vec<Row>, out: &mut Outputs) -> Result<()> {
        let mut rows = rows.into_iter();
        loop {
            let batch: Vec<Row> = rows.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                return Ok(());
            }
            self.run_batch(start, batch, out)?;
        }
    }

    fn run_batch(&mut self, start: usize, mut rows: Vec<Row>, out: &mut Outputs) -> Result<()> {
        for op in &mut self.ops[start..] {
            if rows.is_empty() {
                return Ok(());
            }
            let mut next = Vec::with_capacity(rows.len());
            let mut errors = Vec::new();
            op.process(rows, &mut next, &mut errors)?;
            out.record_errors(errors);
            rows = next;
        }
        if rows.is_empty() {
            return Ok(());
        }
        out.emit(self.encoder.as_mut(), &rows)
    }
}

pub struct Pipeline {
    state: State,
    chain: Option<Chain>,
    out: Outputs,
    config: EngineConfig,
    fingerprint: Hash256,
    started: Instant,
}

impl Pipeline {
    pub fn new(plan: &Plan) -> Result<Self> {
        Self::with_config(plan, EngineConfig::default())
    }

    pub fn with_config(plan: &Plan, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let decoder = decoder_for(plan.decoder()).ok_or_else(|| {
            tranfi_core::Error::Invariant("first plan step is not a decoder".into())
        })?;
        let encoder = encoder_for(plan.encoder()).ok_or_else(|| {
            tranfi_core::Error::Invariant("last plan step is not an encoder".into())
        })?;
        let ops = plan
            .transforms()
            .iter()
            .map(|spec| Operator::from_spec(spec, &config))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let batch_size = decoder.batch_size().unwrap_or(config.batch_size).max(1);
        let fingerprint = plan.fingerprint()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            plan = %fingerprint.short(),
            decoder = decoder.name(),
            encoder = encoder.name(),
            ops = ops.len(),
            batch_size,
            "pipeline created"
        );

        let out = Outputs {
            max_errors: config.max_errors,
            sample_rows: config.sample_rows,
            ..Outputs::default()
        };
        Ok(Self {
            state: State::Open,
            chain: Some(Chain {
                decoder,
                ops,
                encoder,
                batch_size,
            }),
            out,
            config,
            fingerprint,
            started: Instant::now(),
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> RunStats {
        self.out.stats
    }

    pub fn fingerprint(&self) -> Hash256 {
        self.fingerprint
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Feed one chunk of input. Chunks may split records anywhere.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        ensure_open(self.state)?;
        let Some(chain) = self.chain.as_mut() else {
            return Err(ExecError::State("pipeline released"));
        };
        let out = &mut self.out;
        out.stats.bytes_in += bytes.len() as u64;
        if chain.short_circuited() {
            return Ok(());
        }

        let mut rows = Vec::new();
        let mut errors = Vec::new();
        chain.decoder.push(bytes, &mut rows, &mut errors)?;
        out.record_errors(errors);
        out.stats.rows_in += rows.len() as u64;
        chain.run_from(0, rows, out)
    }

    /// End of input: drain the decoder, flush every operator in order, then
    /// the encoder, and write the stats block.
    ///
    /// The pipeline is `Finished` afterwards even when a flush fails; output
    /// produced before the failure stays pullable.
    pub fn finish(&mut self) -> Result<()> {
        ensure_open(self.state)?;
        let result = self.flush_all();
        self.state = State::Finished;
        result
    }

    fn flush_all(&mut self) -> Result<()> {
        let Some(chain) = self.chain.as_mut() else {
            return Err(ExecError::State("pipeline released"));
        };
        let out = &mut self.out;

        if !chain.short_circuited() {
            let mut rows = Vec::new();
            let mut errors = Vec::new();
            chain.decoder.flush(&mut rows, &mut errors)?;
            out.record_errors(errors);
            out.stats.rows_in += rows.len() as u64;
            chain.run_from(0, rows, out)?;
        }

        // A flushed batch only visits the operators after the one that
        // produced it.
        for i in 0..chain.ops.len() {
            let mut rows = Vec::new();
            let mut errors = Vec::new();
            chain.ops[i].flush(&mut rows, &mut errors)?;

            #[cfg(feature = "tracing")]
            tracing::trace!(op = chain.ops[i].name(), rows = rows.len(), "operator flushed");

            out.record_errors(errors);
            chain.run_from(i + 1, rows, out)?;
        }

        let mut tail = Vec::new();
        chain.encoder.finish(&mut tail)?;
        out.write_main(&tail);

        let elapsed_ms = self.started.elapsed().as_millis();
        if self.config.emit_stats {
            let block = stats_block(&out.stats, elapsed_ms, &self.fingerprint);
            out.channel(Channel::Stats).write(block.as_bytes());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            plan = %self.fingerprint.short(),
            rows_in = out.stats.rows_in,
            rows_out = out.stats.rows_out,
            errors = out.stats.errors,
            elapsed_ms = elapsed_ms as u64,
            "pipeline finished"
        );
        emit_span(
            "pipeline.finish",
            &[
                ("rows_in", out.stats.rows_in.to_string()),
                ("rows_out", out.stats.rows_out.to_string()),
                ("bytes_out", out.stats.bytes_out.to_string()),
                ("elapsed_ms", elapsed_ms.to_string()),
            ],
        );
        Ok(())
    }

    /// Copy up to `buf.len()` pending bytes of `channel` into `buf`. Zero
    /// means the channel is currently empty.
    pub fn pull(&mut self, channel: Channel, buf: &mut [u8]) -> Result<usize> {
        if self.state == State::Released {
            return Err(ExecError::State("pipeline released"));
        }
        Ok(self.out.channel(channel).read_into(buf))
    }

    /// Take everything pending on `channel`.
    pub fn drain(&mut self, channel: Channel) -> Result<Vec<u8>> {
        if self.state == State::Released {
            return Err(ExecError::State("pipeline released"));
        }
        Ok(self.out.channel(channel).drain_all())
    }

    /// Drop the decoder, operators, encoder and any unread output.
    pub fn release(&mut self) {
        self.chain = None;
        self.out = Outputs::default();
        self.state = State::Released;
    }
}

fn ensure_open(state: State) -> Result<()> {
    match state {
        State::Open => Ok(()),
        State::Finished => Err(ExecError::State("pipeline already finished")),
        State::Released => Err(ExecError::State("pipeline released")),
    }
}

fn stats_block(stats: &RunStats, elapsed_ms: u128, plan: &Hash256) -> String {
    format!(
        "rows_in: {}\nrows_out: {}\nbytes_in: {}\nbytes_out: {}\nerrors: {}\nelapsed_ms: {}\nplan: {}\n",
        stats.rows_in,
        stats.rows_out,
        stats.bytes_in,
        stats.bytes_out,
        stats.errors,
        elapsed_ms,
        plan.to_hex()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tranfi_planner::compile;

    fn mk_pipeline(dsl: &str) -> Pipeline {
        Pipeline::new(&compile(dsl).expect("compile")).expect("pipeline")
    }

    fn drain_str(p: &mut Pipeline, ch: Channel) -> String {
        String::from_utf8(p.drain(ch).expect("drain")).expect("utf8")
    }

    fn stat(block: &str, key: &str) -> Option<String> {
        block
            .lines()
            .find_map(|l| l.strip_prefix(&format!("{key}: ")).map(str::to_string))
    }

    #[test]
    fn failed_flush_still_finishes() {
        let mut p = mk_pipeline("csv | stack /nonexistent/tranfi/more.csv | csv");
        p.push(b"a\n1\n2\n").expect("push");
        let err = p.finish().expect_err("missing stack file");
        assert!(matches!(err, ExecError::Operator(_)), "{err}");
        assert_eq!(p.state(), State::Finished);

        assert_eq!(drain_str(&mut p, Channel::Main), "a\n1\n2\n");
        assert_eq!(
            p.finish().expect_err("second finish").to_string(),
            "pipeline already finished"
        );
        assert!(p.push(b"3\n").is_err());
    }

    #[test]
    fn push_finish_pull() {
        let mut p = mk_pipeline("csv | head 2 | csv");
        p.push(b"name,age\nAlice,30\nBob,").expect("push");
        p.push(b"25\nCharlie,35\n").expect("push");
        p.finish().expect("finish");
        assert_eq!(p.state(), State::Finished);
        assert_eq!(drain_str(&mut p, Channel::Main), "name,age\nAlice,30\nBob,25\n");

        let stats = drain_str(&mut p, Channel::Stats);
        assert_eq!(stat(&stats, "rows_out").as_deref(), Some("2"));
        assert_eq!(stat(&stats, "bytes_in").as_deref(), Some("36"));
        assert_eq!(stat(&stats, "plan"), Some(p.fingerprint().to_hex()));
        assert!(stat(&stats, "elapsed_ms").is_some());
    }

    #[test]
    fn pull_in_small_pieces() {
        let mut p = mk_pipeline("csv | jsonl");
        p.push(b"a\n1\n2\n").expect("push");
        p.finish().expect("finish");
        let mut buf = [0u8; 3];
        let mut got = Vec::new();
        loop {
            let n = p.pull(Channel::Main, &mut buf).expect("pull");
            if n == 0 {
                break;
            }
            got.extend_from_slice(&buf[..n]);
        }
        assert_eq!(got, b"{\"a\":1}\n{\"a\":2}\n");
        assert_eq!(p.pull(Channel::Main, &mut buf).expect("pull"), 0);
    }

    #[test]
    fn lifecycle_errors() {
        let mut p = mk_pipeline("csv | csv");
        p.finish().expect("finish");
        let err = p.push(b"x\n").expect_err("push after finish");
        assert_eq!(err.to_string(), "pipeline already finished");
        assert!(p.finish().is_err());

        p.release();
        assert_eq!(p.state(), State::Released);
        let err = p.push(b"x\n").expect_err("push after release");
        assert_eq!(err.to_string(), "pipeline released");
        assert_eq!(p.finish().expect_err("finish").to_string(), "pipeline released");
        assert!(p.pull(Channel::Main, &mut [0u8; 4]).is_err());
    }

    #[test]
    fn row_errors_go_to_channel_one() {
        let mut p = mk_pipeline("csv | select name,missing | csv");
        p.push(b"name\nA\nB\n").expect("push");
        p.finish().expect("finish");
        let errors = drain_str(&mut p, Channel::Errors);
        assert_eq!(errors, "{\"op\":\"select\",\"error\":\"column 'missing' not found\"}\n");
        assert_eq!(p.stats().errors, 1);
        assert_eq!(drain_str(&mut p, Channel::Main), "name\nA\nB\n");
    }

    #[test]
    fn error_records_are_capped_but_counted() {
        let plan = compile("csv | cast x=int | csv").expect("compile");
        let cfg = EngineConfig {
            max_errors: 2,
            ..EngineConfig::default()
        };
        let mut p = Pipeline::with_config(&plan, cfg).expect("pipeline");
        p.push(b"x\na\nb\nc\nd\n").expect("push");
        p.finish().expect("finish");
        assert_eq!(p.stats().errors, 4);
        assert_eq!(drain_str(&mut p, Channel::Errors).lines().count(), 2);
    }

    #[test]
    fn samples_mirror_first_rows() {
        let plan = compile("csv | csv").expect("compile");
        let cfg = EngineConfig {
            sample_rows: 2,
            emit_stats: false,
            ..EngineConfig::default()
        };
        let mut p = Pipeline::with_config(&plan, cfg).expect("pipeline");
        p.push(b"v\n1\n2\n3\n").expect("push");
        p.finish().expect("finish");
        assert_eq!(drain_str(&mut p, Channel::Samples), "{\"v\":1}\n{\"v\":2}\n");
        assert!(drain_str(&mut p, Channel::Stats).is_empty());
    }

    #[test]
    fn flushed_rows_only_visit_later_operators() {
        // `tail` emits at flush; the `head` before it must not see those rows
        // again, the `head` after it must.
        let mut p = mk_pipeline("csv | head 3 | tail 2 | head 1 | csv");
        p.push(b"n\n1\n2\n3\n4\n").expect("push");
        p.finish().expect("finish");
        assert_eq!(drain_str(&mut p, Channel::Main), "n\n2\n");
    }

    #[test]
    fn head_short_circuits_decoding() {
        let mut p = mk_pipeline("csv | head 1 | csv");
        p.push(b"n\n1\n2\n").expect("push");
        p.push(b"3\n4\n").expect("push");
        p.finish().expect("finish");
        let stats = p.stats();
        assert_eq!(stats.rows_in, 2);
        assert_eq!(stats.rows_out, 1);
        assert_eq!(stats.bytes_in, 10);
    }

    #[test]
    fn batch_size_does_not_change_results() {
        let plan = compile("csv | step v running-sum cumsum | csv").expect("compile");
        let input = b"v\n10\n20\n30\n";
        let mut outputs = Vec::new();
        for batch_size in [1, 2, 1024] {
            let cfg = EngineConfig {
                batch_size,
                ..EngineConfig::default()
            };
            let mut p = Pipeline::with_config(&plan, cfg).expect("pipeline");
            p.push(input).expect("push");
            p.finish().expect("finish");
            outputs.push(drain_str(&mut p, Channel::Main));
        }
        assert_eq!(outputs[0], "v,cumsum\n10,10\n20,30\n30,60\n");
        assert!(outputs.iter().all(|o| *o == outputs[0]));
    }

    #[test]
    fn channel_ids() {
        assert_eq!(Channel::from_id(2).expect("stats"), Channel::Stats);
        assert_eq!(Channel::Samples.id(), 3);
        assert!(matches!(Channel::from_id(4), Err(ExecError::InvalidChannel(4))));
    }
}
