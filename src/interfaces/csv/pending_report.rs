use crate::application::admin::PendingOrderSummary;
use crate::error::Result;
use std::io::Write;

/// Writes pending gateway orders as CSV, one row per order, with a header row.
pub struct PendingReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PendingReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_summaries<I>(&mut self, summaries: I) -> Result<()>
    where
        I: IntoIterator<Item = PendingOrderSummary>,
    {
        for summary in summaries {
            self.writer.serialize(summary)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
