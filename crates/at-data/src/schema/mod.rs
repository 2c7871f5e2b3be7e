//! Tabular hand-off of records to the grid

use std::sync::Arc;
use arrow::array::{ArrayRef, Int64Builder, StringBuilder, UInt64Builder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use at_core::Record;

use crate::DataError;

/// Schema of the rows handed to the grid, one column per record field
pub fn record_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::UInt64, false),
        Field::new("title", DataType::Utf8, true),
        Field::new("place_of_origin", DataType::Utf8, true),
        Field::new("artist_display", DataType::Utf8, true),
        Field::new("inscriptions", DataType::Utf8, true),
        Field::new("date_start", DataType::Int64, true),
        Field::new("date_end", DataType::Int64, true),
    ]))
}

/// Convert a page of records into a record batch, preserving row order
pub fn records_to_batch(records: &[Record]) -> Result<RecordBatch, DataError> {
    let mut ids = UInt64Builder::with_capacity(records.len());
    let mut titles = StringBuilder::new();
    let mut origins = StringBuilder::new();
    let mut artists = StringBuilder::new();
    let mut inscriptions = StringBuilder::new();
    let mut starts = Int64Builder::with_capacity(records.len());
    let mut ends = Int64Builder::with_capacity(records.len());

    for record in records {
        ids.append_value(record.id);
        titles.append_option(record.title.as_deref());
        origins.append_option(record.place_of_origin.as_deref());
        artists.append_option(record.artist_display.as_deref());
        inscriptions.append_option(record.inscriptions.as_deref());
        starts.append_option(record.date_start);
        ends.append_option(record.date_end);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(ids.finish()),
        Arc::new(titles.finish()),
        Arc::new(origins.finish()),
        Arc::new(artists.finish()),
        Arc::new(inscriptions.finish()),
        Arc::new(starts.finish()),
        Arc::new(ends.finish()),
    ];

    Ok(RecordBatch::try_new(record_schema(), columns)?)
}
