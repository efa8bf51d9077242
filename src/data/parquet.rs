//! Parquet archive reader/writer

use arrow::array::{
    Array, ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::observation::Observation;
use crate::signal::{Signal, TriggerKind};
use crate::trading::Position;

/// Observation schema fields
pub fn observation_schema() -> Schema {
    Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("ticker", DataType::Utf8, false),
        Field::new("mentions", DataType::Int64, true),
        // Stored as string for Decimal precision
        Field::new("price", DataType::Utf8, true),
        Field::new("sentiment", DataType::Float64, true),
    ])
}

/// Signal schema fields
pub fn signal_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "created_at",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("ticker", DataType::Utf8, false),
        // JSON-encoded trigger list
        Field::new("triggers", DataType::Utf8, false),
        Field::new("conviction", DataType::Float64, false),
        Field::new("price_at_signal", DataType::Utf8, true),
        Field::new("notes", DataType::Utf8, false),
    ])
}

/// Closed trade schema fields
pub fn trade_schema() -> Schema {
    Schema::new(vec![
        Field::new("ticker", DataType::Utf8, false),
        Field::new("entry_date", DataType::Utf8, false),
        Field::new("entry_price", DataType::Utf8, false),
        Field::new("shares", DataType::Int64, false),
        Field::new("position_size", DataType::Utf8, false),
        Field::new("conviction", DataType::Float64, false),
        Field::new("signal_types", DataType::Utf8, false),
        Field::new("exit_date", DataType::Utf8, true),
        Field::new("exit_price", DataType::Utf8, true),
        Field::new("exit_reason", DataType::Utf8, true),
        Field::new("return_pct", DataType::Utf8, true),
        Field::new("profit_loss", DataType::Utf8, true),
        Field::new("days_held", DataType::Int64, true),
    ])
}

/// Parquet-backed archive rooted at one directory
pub struct ParquetArchive {
    dir: PathBuf,
}

impl ParquetArchive {
    /// Create an archive over a directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Ensure the archive directory exists
    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// File path for a prefix and timestamp
    pub fn file_path(&self, prefix: &str, timestamp: DateTime<Utc>) -> PathBuf {
        let filename = format!("{}_{}.parquet", prefix, timestamp.format("%Y%m%d_%H%M%S"));
        self.dir.join(filename)
    }

    fn writer_props() -> WriterProperties {
        WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build()
    }

    /// Write observations to a timestamped Parquet file
    pub fn write_observations(
        &self,
        observations: &[Observation],
        stamp: DateTime<Utc>,
    ) -> anyhow::Result<Option<PathBuf>> {
        if observations.is_empty() {
            return Ok(None);
        }
        self.ensure_dir()?;

        let schema = Arc::new(observation_schema());
        let path = self.file_path("observations", stamp);
        let file = File::create(&path)?;
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(Self::writer_props()))?;

        let timestamps: Vec<i64> = observations
            .iter()
            .map(|o| o.timestamp.timestamp_micros())
            .collect();
        let tickers: Vec<&str> = observations.iter().map(|o| o.ticker.as_str()).collect();
        let mentions: Vec<Option<i64>> = observations
            .iter()
            .map(|o| o.mentions.map(|m| m as i64))
            .collect();
        let prices: Vec<Option<String>> = observations
            .iter()
            .map(|o| o.price.map(|p| p.to_string()))
            .collect();
        let sentiments: Vec<Option<f64>> = observations.iter().map(|o| o.sentiment).collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC"))
                    as ArrayRef,
                Arc::new(StringArray::from(tickers)) as ArrayRef,
                Arc::new(Int64Array::from(mentions)) as ArrayRef,
                Arc::new(StringArray::from(prices)) as ArrayRef,
                Arc::new(Float64Array::from(sentiments)) as ArrayRef,
            ],
        )?;

        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(path = ?path, count = observations.len(), "Wrote observations to Parquet");
        Ok(Some(path))
    }

    /// Read observations from one Parquet file
    pub fn read_observations(&self, path: &Path) -> anyhow::Result<Vec<Observation>> {
        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut observations = Vec::new();
        for batch_result in reader {
            let batch = batch_result?;

            let timestamps = downcast::<TimestampMicrosecondArray>(&batch, 0, "timestamp")?;
            let tickers = downcast::<StringArray>(&batch, 1, "ticker")?;
            let mentions = downcast::<Int64Array>(&batch, 2, "mentions")?;
            let prices = downcast::<StringArray>(&batch, 3, "price")?;
            let sentiments = downcast::<Float64Array>(&batch, 4, "sentiment")?;

            for i in 0..batch.num_rows() {
                let timestamp = DateTime::from_timestamp_micros(timestamps.value(i))
                    .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))?;
                observations.push(Observation {
                    ticker: tickers.value(i).to_string(),
                    timestamp,
                    mentions: value_opt(mentions, i).map(|m| m as u32),
                    price: string_opt(prices, i)
                        .map(|s| Decimal::from_str(&s))
                        .transpose()?,
                    sentiment: value_opt(sentiments, i),
                });
            }
        }
        Ok(observations)
    }

    /// Read every observation file in the archive, oldest first
    pub fn read_all_observations(&self) -> anyhow::Result<Vec<Observation>> {
        let mut observations = Vec::new();
        for path in self.files_with_prefix("observations")? {
            observations.extend(self.read_observations(&path)?);
        }
        Ok(observations)
    }

    /// Write signals to a timestamped Parquet file
    pub fn write_signals(
        &self,
        signals: &[Signal],
        stamp: DateTime<Utc>,
    ) -> anyhow::Result<Option<PathBuf>> {
        if signals.is_empty() {
            return Ok(None);
        }
        self.ensure_dir()?;

        let schema = Arc::new(signal_schema());
        let path = self.file_path("signals", stamp);
        let file = File::create(&path)?;
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(Self::writer_props()))?;

        let ids: Vec<String> = signals.iter().map(|s| s.id.to_string()).collect();
        let created: Vec<i64> = signals
            .iter()
            .map(|s| s.created_at.timestamp_micros())
            .collect();
        let tickers: Vec<&str> = signals.iter().map(|s| s.ticker.as_str()).collect();
        let triggers: Vec<String> = signals
            .iter()
            .map(|s| serde_json::to_string(&s.triggers))
            .collect::<Result<_, _>>()?;
        let convictions: Vec<f64> = signals.iter().map(|s| s.conviction).collect();
        let prices: Vec<Option<String>> = signals
            .iter()
            .map(|s| s.price_at_signal.map(|p| p.to_string()))
            .collect();
        let notes: Vec<&str> = signals.iter().map(|s| s.notes.as_str()).collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(
                    ids.iter().map(String::as_str).collect::<Vec<_>>(),
                )) as ArrayRef,
                Arc::new(TimestampMicrosecondArray::from(created).with_timezone("UTC")) as ArrayRef,
                Arc::new(StringArray::from(tickers)) as ArrayRef,
                Arc::new(StringArray::from(
                    triggers.iter().map(String::as_str).collect::<Vec<_>>(),
                )) as ArrayRef,
                Arc::new(Float64Array::from(convictions)) as ArrayRef,
                Arc::new(StringArray::from(prices)) as ArrayRef,
                Arc::new(StringArray::from(notes)) as ArrayRef,
            ],
        )?;

        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(path = ?path, count = signals.len(), "Wrote signals to Parquet");
        Ok(Some(path))
    }

    /// Read signals from one Parquet file
    pub fn read_signals(&self, path: &Path) -> anyhow::Result<Vec<Signal>> {
        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut signals = Vec::new();
        for batch_result in reader {
            let batch = batch_result?;

            let ids = downcast::<StringArray>(&batch, 0, "id")?;
            let created = downcast::<TimestampMicrosecondArray>(&batch, 1, "created_at")?;
            let tickers = downcast::<StringArray>(&batch, 2, "ticker")?;
            let triggers = downcast::<StringArray>(&batch, 3, "triggers")?;
            let convictions = downcast::<Float64Array>(&batch, 4, "conviction")?;
            let prices = downcast::<StringArray>(&batch, 5, "price_at_signal")?;
            let notes = downcast::<StringArray>(&batch, 6, "notes")?;

            for i in 0..batch.num_rows() {
                let created_at = DateTime::from_timestamp_micros(created.value(i))
                    .ok_or_else(|| anyhow::anyhow!("Invalid created_at"))?;
                let trigger_list: Vec<TriggerKind> = serde_json::from_str(triggers.value(i))?;

                signals.push(Signal {
                    id: Uuid::from_str(ids.value(i))?,
                    ticker: tickers.value(i).to_string(),
                    triggers: trigger_list,
                    conviction: convictions.value(i),
                    price_at_signal: string_opt(prices, i)
                        .map(|s| Decimal::from_str(&s))
                        .transpose()?,
                    created_at,
                    notes: notes.value(i).to_string(),
                });
            }
        }
        Ok(signals)
    }

    /// Read every signal file in the archive, oldest first
    pub fn read_all_signals(&self) -> anyhow::Result<Vec<Signal>> {
        let mut signals = Vec::new();
        for path in self.files_with_prefix("signals")? {
            signals.extend(self.read_signals(&path)?);
        }
        Ok(signals)
    }

    /// Write closed trades to a timestamped Parquet file
    pub fn write_closed_trades(
        &self,
        positions: &[&Position],
        stamp: DateTime<Utc>,
    ) -> anyhow::Result<Option<PathBuf>> {
        if positions.is_empty() {
            return Ok(None);
        }
        self.ensure_dir()?;

        let schema = Arc::new(trade_schema());
        let path = self.file_path("trades", stamp);
        let file = File::create(&path)?;
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(Self::writer_props()))?;

        let tickers: Vec<&str> = positions.iter().map(|p| p.ticker.as_str()).collect();
        let entry_dates: Vec<String> = positions.iter().map(|p| p.entry_date.to_string()).collect();
        let entry_prices: Vec<String> =
            positions.iter().map(|p| p.entry_price.to_string()).collect();
        let shares: Vec<i64> = positions.iter().map(|p| p.shares as i64).collect();
        let sizes: Vec<String> = positions
            .iter()
            .map(|p| p.position_size.to_string())
            .collect();
        let convictions: Vec<f64> = positions.iter().map(|p| p.conviction).collect();
        let signal_types: Vec<String> = positions
            .iter()
            .map(|p| serde_json::to_string(&p.signal_types))
            .collect::<Result<_, _>>()?;
        let exit_dates: Vec<Option<String>> = positions
            .iter()
            .map(|p| p.exit.as_ref().map(|e| e.exit_date.to_string()))
            .collect();
        let exit_prices: Vec<Option<String>> = positions
            .iter()
            .map(|p| p.exit.as_ref().map(|e| e.exit_price.to_string()))
            .collect();
        let exit_reasons: Vec<Option<&str>> = positions
            .iter()
            .map(|p| p.exit.as_ref().map(|e| e.exit_reason.as_str()))
            .collect();
        let returns: Vec<Option<String>> = positions
            .iter()
            .map(|p| p.exit.as_ref().map(|e| e.return_pct.to_string()))
            .collect();
        let pnls: Vec<Option<String>> = positions
            .iter()
            .map(|p| p.exit.as_ref().map(|e| e.profit_loss.to_string()))
            .collect();
        let days: Vec<Option<i64>> = positions
            .iter()
            .map(|p| p.exit.as_ref().map(|e| e.days_held))
            .collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(tickers)) as ArrayRef,
                Arc::new(StringArray::from(
                    entry_dates.iter().map(String::as_str).collect::<Vec<_>>(),
                )) as ArrayRef,
                Arc::new(StringArray::from(
                    entry_prices.iter().map(String::as_str).collect::<Vec<_>>(),
                )) as ArrayRef,
                Arc::new(Int64Array::from(shares)) as ArrayRef,
                Arc::new(StringArray::from(
                    sizes.iter().map(String::as_str).collect::<Vec<_>>(),
                )) as ArrayRef,
                Arc::new(Float64Array::from(convictions)) as ArrayRef,
                Arc::new(StringArray::from(
                    signal_types.iter().map(String::as_str).collect::<Vec<_>>(),
                )) as ArrayRef,
                Arc::new(StringArray::from(exit_dates)) as ArrayRef,
                Arc::new(StringArray::from(exit_prices)) as ArrayRef,
                Arc::new(StringArray::from(exit_reasons)) as ArrayRef,
                Arc::new(StringArray::from(returns)) as ArrayRef,
                Arc::new(StringArray::from(pnls)) as ArrayRef,
                Arc::new(Int64Array::from(days)) as ArrayRef,
            ],
        )?;

        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(path = ?path, count = positions.len(), "Wrote closed trades to Parquet");
        Ok(Some(path))
    }

    /// Daily price table derived from archived observations
    ///
    /// The last observed price per ticker per day wins, matching the
    /// daily granularity the simulator evaluates at.
    pub fn price_table(&self) -> anyhow::Result<Vec<(String, NaiveDate, Decimal)>> {
        let mut observations = self.read_all_observations()?;
        observations.sort_by_key(|o| o.timestamp);
        let mut table: std::collections::BTreeMap<(String, NaiveDate), Decimal> =
            std::collections::BTreeMap::new();
        for obs in observations {
            if let Some(price) = obs.price {
                table.insert((obs.ticker, obs.timestamp.date_naive()), price);
            }
        }
        Ok(table
            .into_iter()
            .map(|((ticker, date), price)| (ticker, date, price))
            .collect())
    }

    /// Archive files with a prefix, sorted by name (oldest first)
    fn files_with_prefix(&self, prefix: &str) -> anyhow::Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "parquet")
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(prefix))
            })
            .collect();
        paths.sort();
        Ok(paths)
    }
}

fn downcast<'a, T: 'static>(
    batch: &'a RecordBatch,
    index: usize,
    name: &str,
) -> anyhow::Result<&'a T> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow::anyhow!("Invalid {name} column"))
}

fn value_opt<T: arrow::array::Array + ValueAt>(array: &T, index: usize) -> Option<T::Value> {
    if array.is_null(index) {
        None
    } else {
        Some(array.value_at(index))
    }
}

fn string_opt(array: &StringArray, index: usize) -> Option<String> {
    if array.is_null(index) {
        None
    } else {
        Some(array.value(index).to_string())
    }
}

/// Typed value access used by the nullable readers
trait ValueAt {
    type Value;
    fn value_at(&self, index: usize) -> Self::Value;
}

impl ValueAt for Int64Array {
    type Value = i64;
    fn value_at(&self, index: usize) -> i64 {
        self.value(index)
    }
}

impl ValueAt for Float64Array {
    type Value = f64;
    fn value_at(&self, index: usize) -> f64 {
        self.value(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::TriggerKind;
    use crate::trading::{ExitReason, ExitRecord, PositionStatus};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 8, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_observation_schema() {
        let schema = observation_schema();
        assert_eq!(schema.fields().len(), 5);
        assert_eq!(schema.field(0).name(), "timestamp");
        assert_eq!(schema.field(1).name(), "ticker");
    }

    #[test]
    fn test_file_path_naming() {
        let archive = ParquetArchive::new("/data");
        let path = archive.file_path("observations", stamp());
        assert_eq!(
            path,
            PathBuf::from("/data/observations_20240308_123000.parquet")
        );
    }

    #[test]
    fn test_observation_round_trip() {
        let dir = TempDir::new().unwrap();
        let archive = ParquetArchive::new(dir.path());

        let observations = vec![
            Observation {
                ticker: "GME".to_string(),
                timestamp: stamp(),
                mentions: Some(42),
                price: Some(dec!(25.13)),
                sentiment: Some(0.31),
            },
            Observation {
                ticker: "AMC".to_string(),
                timestamp: stamp(),
                mentions: None,
                price: None,
                sentiment: None,
            },
        ];

        let path = archive
            .write_observations(&observations, stamp())
            .unwrap()
            .unwrap();
        let read_back = archive.read_observations(&path).unwrap();

        assert_eq!(read_back.len(), 2);
        assert_eq!(read_back[0].ticker, "GME");
        assert_eq!(read_back[0].mentions, Some(42));
        assert_eq!(read_back[0].price, Some(dec!(25.13)));
        assert_eq!(read_back[0].sentiment, Some(0.31));
        assert!(read_back[1].mentions.is_none());
        assert!(read_back[1].price.is_none());
    }

    #[test]
    fn test_empty_write_creates_no_file() {
        let dir = TempDir::new().unwrap();
        let archive = ParquetArchive::new(dir.path());
        assert!(archive.write_observations(&[], stamp()).unwrap().is_none());
        assert!(archive.read_all_observations().unwrap().is_empty());
    }

    #[test]
    fn test_signal_round_trip() {
        let dir = TempDir::new().unwrap();
        let archive = ParquetArchive::new(dir.path());

        let signals = vec![Signal::new(
            "GME",
            vec![TriggerKind::VelocitySpike, TriggerKind::InsiderCluster],
            85.0,
            Some(dec!(25.13)),
            stamp(),
            "Mentions up 120% in 24h".to_string(),
        )];

        archive.write_signals(&signals, stamp()).unwrap();
        let read_back = archive.read_all_signals().unwrap();

        assert_eq!(read_back.len(), 1);
        let signal = &read_back[0];
        assert_eq!(signal.id, signals[0].id);
        assert_eq!(signal.ticker, "GME");
        assert_eq!(
            signal.triggers,
            vec![TriggerKind::VelocitySpike, TriggerKind::InsiderCluster]
        );
        assert_eq!(signal.conviction, 85.0);
        assert_eq!(signal.price_at_signal, Some(dec!(25.13)));
        assert_eq!(signal.notes, "Mentions up 120% in 24h");
    }

    #[test]
    fn test_closed_trade_write() {
        let dir = TempDir::new().unwrap();
        let archive = ParquetArchive::new(dir.path());

        let position = Position {
            ticker: "GME".to_string(),
            entry_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            entry_price: dec!(100),
            shares: 16,
            position_size: dec!(1600),
            conviction: 80.0,
            signal_types: vec![TriggerKind::VelocitySpike],
            stop_loss_price: dec!(90),
            target_price: dec!(120),
            status: PositionStatus::Closed,
            exit: Some(ExitRecord {
                exit_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                exit_price: dec!(90),
                exit_reason: ExitReason::StopLoss,
                return_pct: dec!(-10),
                profit_loss: dec!(-160),
                days_held: 3,
            }),
        };

        let path = archive
            .write_closed_trades(&[&position], stamp())
            .unwrap()
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_price_table_last_price_per_day_wins() {
        let dir = TempDir::new().unwrap();
        let archive = ParquetArchive::new(dir.path());

        let day = Utc.with_ymd_and_hms(2024, 3, 8, 9, 0, 0).unwrap();
        let observations = vec![
            Observation {
                ticker: "GME".to_string(),
                timestamp: day,
                mentions: None,
                price: Some(dec!(24)),
                sentiment: None,
            },
            Observation {
                ticker: "GME".to_string(),
                timestamp: day + chrono::Duration::hours(6),
                mentions: None,
                price: Some(dec!(26)),
                sentiment: None,
            },
        ];
        archive.write_observations(&observations, stamp()).unwrap();

        let table = archive.price_table().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].2, dec!(26));
    }

    #[test]
    fn test_missing_dir_reads_empty() {
        let archive = ParquetArchive::new("/nonexistent/archive/dir");
        assert!(archive.read_all_observations().unwrap().is_empty());
        assert!(archive.read_all_signals().unwrap().is_empty());
    }
}
