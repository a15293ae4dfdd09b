use std::{
    fmt::Display,
    io::{self, Write},
};

use indicatif::ProgressBar;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// プログレスバーを一時的に消してからログを書く
pub struct BarLogger {
    inner: env_logger::Logger,
    pb: ProgressBar,
}

impl BarLogger {
    /// `RUST_LOG` を読んで `log` のロガーとして登録する
    pub fn init(pb: ProgressBar) -> Result<(), SetLoggerError> {
        let inner = env_logger::Builder::from_default_env().build();
        let level: LevelFilter = inner.filter();
        log::set_boxed_logger(Box::new(BarLogger { inner, pb }))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for BarLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.inner.matches(record) {
            self.pb.suspend(|| self.inner.log(record));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// 1行ごとの結果を `out` (通常は stdout) に書き、バーを進める
pub struct RowPrinter<W> {
    pb: ProgressBar,
    out: W,
}

impl<W: Write> RowPrinter<W> {
    pub fn new(pb: ProgressBar, out: W) -> RowPrinter<W> {
        RowPrinter { pb, out }
    }

    pub fn print(&mut self, line: impl Display) -> io::Result<()> {
        let out = &mut self.out;
        self.pb.suspend(|| writeln!(out, "{line}"))?;
        self.pb.inc(1);
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use indicatif::ProgressDrawTarget;

    use super::*;

    #[test]
    fn lines_go_to_output_not_bar() {
        let pb = ProgressBar::with_draw_target(Some(2), ProgressDrawTarget::stderr());
        let mut printer = RowPrinter::new(pb.clone(), Vec::new());
        printer.print("[OK] Registered: widget::A1").unwrap();
        printer.print("[SKIP] Already exists: gadget::B2").unwrap();

        assert_eq!(pb.position(), 2);
        let out = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(
            out,
            "[OK] Registered: widget::A1\n[SKIP] Already exists: gadget::B2\n"
        );
    }

    #[test]
    fn hidden_bar_still_prints() {
        let mut printer = RowPrinter::new(ProgressBar::hidden(), Vec::new());
        printer.print("[ERR] Failed: x -> {}").unwrap();
        assert_eq!(printer.into_inner(), b"[ERR] Failed: x -> {}\n");
    }
}
