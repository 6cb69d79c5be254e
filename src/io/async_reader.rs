//! Asynchronous CSV reader
//!
//! Reads ledger commands in batches from any `futures` `AsyncRead`. Rows that
//! fail to parse or convert are logged and skipped; a malformed batch row drops
//! its whole batch. Batch rows are merged across `read_batch` calls, so a batch
//! is never split between two reads.

use crate::io::csv_format::{convert_csv_record, BatchAssembler, CsvRecord};
use crate::types::LedgerCommand;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    assembler: BatchAssembler,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            assembler: BatchAssembler::new(),
            exhausted: false,
        }
    }

    /// Read up to `batch_size` complete commands
    ///
    /// An empty batch means the input is exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<LedgerCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        if self.exhausted {
            return batch;
        }

        let mut records = self.csv_reader.deserialize::<CsvRecord>();
        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => {
                    let batch_id = csv_record.batch_id();
                    let complete = match (convert_csv_record(csv_record), batch_id) {
                        (Ok(command), _) => self.assembler.push(command),
                        (Err(e), Some(batch_id)) => self.assembler.poison(batch_id, e),
                        (Err(e), None) => {
                            tracing::warn!(error = %e, "Record conversion error");
                            None
                        }
                    };
                    collect(&mut batch, complete);
                }
                Some(Err(e)) => tracing::warn!(error = %e, "CSV parse error"),
                None => {
                    self.exhausted = true;
                    collect(&mut batch, self.assembler.finish());
                    break;
                }
            }
        }

        batch
    }
}

fn collect(batch: &mut Vec<LedgerCommand>, complete: Option<Result<LedgerCommand, String>>) {
    match complete {
        Some(Ok(command)) => batch.push(command),
        Some(Err(e)) => tracing::warn!(error = %e, "Batch rejected"),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;

    const HEADER: &str =
        "type,account,name,currency,allow_negative,allow_positive,from,to,amount,batch,event_at,metadata\n";

    fn reader(rows: &str) -> AsyncReader<Cursor<Vec<u8>>> {
        AsyncReader::new(Cursor::new(format!("{}{}", HEADER, rows).into_bytes()))
    }

    fn label(command: &LedgerCommand) -> &str {
        command.labels()[0]
    }

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let mut async_reader = reader("account,a,,USD\naccount,b,,USD\naccount,c,,USD\n");

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(label(&batch[0]), "a");
        assert_eq!(label(&batch[1]), "b");

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(label(&batch[0]), "c");

        assert!(async_reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut async_reader = reader("");
        assert!(async_reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_records() {
        let mut async_reader = reader("refund,a\naccount,a,,USD\ntransfer,,,,,,a,b,NaN?\n");

        let batch = async_reader.read_batch(10).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(label(&batch[0]), "a");
    }

    #[tokio::test]
    async fn test_async_reader_keeps_batches_whole_across_reads() {
        let mut async_reader = reader(
            "transfer,,,,,,a,b,1,b1\n\
             transfer,,,,,,b,c,1,b1\n\
             transfer,,,,,,c,d,1,b1\n\
             account,z,,USD\n",
        );

        let first = async_reader.read_batch(1).await;
        assert_eq!(first.len(), 1);
        match &first[0] {
            LedgerCommand::Batch { entries, .. } => assert_eq!(entries.len(), 3),
            other => panic!("unexpected command {:?}", other),
        }

        let second = async_reader.read_batch(1).await;
        assert_eq!(second.len(), 1);
        assert_eq!(label(&second[0]), "z");
    }

    #[tokio::test]
    async fn test_async_reader_drops_batch_with_malformed_row() {
        let mut async_reader = reader(
            "transfer,,,,,,a,b,100,b1\n\
             transfer,,,,,,a,b,abc,b1\n\
             transfer,,,,,,a,b,1,b1\n\
             transfer,,,,,,a,b,5,b2\n",
        );

        let batch = async_reader.read_batch(1).await;
        assert_eq!(batch.len(), 1);
        match &batch[0] {
            LedgerCommand::Batch { batch, entries } => {
                assert_eq!(batch, "b2");
                assert_eq!(entries.len(), 1);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(async_reader.read_batch(1).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_whitespace_and_case() {
        let mut async_reader = reader("  ACCOUNT  ,  bank  ,,  USD  \n");

        let batch = async_reader.read_batch(10).await;
        assert_eq!(
            batch,
            vec![LedgerCommand::OpenAccount {
                label: "bank".to_string(),
                name: "bank".to_string(),
                currency: "USD".to_string(),
                allow_negative_balance: true,
                allow_positive_balance: true,
            }]
        );
    }
}
