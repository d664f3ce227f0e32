use crate::domain::payment::{Payment, PaymentStatus};
use crate::error::Result;
use std::io::Write;

/// Writes the final payment report as CSV.
///
/// Amounts are normalized (no trailing zeros) so output is stable across
/// runs regardless of input formatting.
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
    max_retries: u32,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(target: W, max_retries: u32) -> Self {
        Self {
            writer: csv::Writer::from_writer(target),
            max_retries,
        }
    }

    pub fn write_payments<I>(&mut self, payments: I) -> Result<()>
    where
        I: IntoIterator<Item = Payment>,
    {
        self.writer.write_record([
            "appointment",
            "amount",
            "method",
            "status",
            "applied",
            "retryable",
        ])?;
        for payment in payments {
            let amount = payment.amount.normalize().to_string();
            let applied = payment
                .amount_applied
                .map(|a| a.normalize().to_string())
                .unwrap_or_default();
            let retryable = payment.status == PaymentStatus::Failed
                && payment.retry_attempt + 1 < self.max_retries;
            self.writer.write_record([
                payment.appointment_id.as_str(),
                amount.as_str(),
                payment.method.as_str(),
                payment.status.as_str(),
                applied.as_str(),
                if retryable { "true" } else { "false" },
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{Amount, PaymentMethod};
    use rust_decimal_macros::dec;

    #[test]
    fn test_writer_output() {
        let mut completed = Payment::new(
            "apt-1",
            "salon-1",
            Amount::new(dec!(40.0)).unwrap(),
            PaymentMethod::Cash,
            0,
        );
        completed.complete(dec!(40.0)).unwrap();

        let mut failed = Payment::new(
            "apt-2",
            "salon-1",
            Amount::new(dec!(20.50)).unwrap(),
            PaymentMethod::Card,
            0,
        );
        failed.fail("card_declined").unwrap();

        let mut buffer = Vec::new();
        let mut writer = PaymentWriter::new(&mut buffer, 2);
        writer.write_payments(vec![completed, failed]).unwrap();
        drop(writer);

        let output = String::from_utf8(buffer).unwrap();
        let mut lines = output.lines();
        assert_eq!(
            lines.next().unwrap(),
            "appointment,amount,method,status,applied,retryable"
        );
        assert_eq!(lines.next().unwrap(), "apt-1,40,cash,completed,40,false");
        assert_eq!(lines.next().unwrap(), "apt-2,20.5,card,failed,,true");
    }

    #[test]
    fn test_failed_at_last_attempt_is_not_retryable() {
        let mut payment = Payment::new(
            "apt-1",
            "salon-1",
            Amount::new(dec!(10.0)).unwrap(),
            PaymentMethod::Card,
            1,
        );
        payment.fail("card_declined").unwrap();

        let mut buffer = Vec::new();
        let mut writer = PaymentWriter::new(&mut buffer, 2);
        writer.write_payments(vec![payment]).unwrap();
        drop(writer);

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.lines().nth(1).unwrap().ends_with(",false"));
    }
}
