//! Python bindings using PyO3

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyBytes;

use crate::write::{document_csv, events_to_json, WriteOptions};
use crate::{parse_sgml, SubmissionEvent};

/// Parse a submission and return (metadata_json, document_csv, documents)
///
/// Args:
///     data: Raw submission bytes
///     filter_document_types: Document types to keep (empty = all)
///     keep_filtered_metadata: Keep CSV rows for filtered-out documents
///
/// Returns:
///     Tuple of (metadata_json_bytes, csv_bytes, list_of_document_bytes)
#[pyfunction]
#[pyo3(signature = (data, filter_document_types=vec![], keep_filtered_metadata=false))]
fn parse_to_json(
    py: Python<'_>,
    data: &[u8],
    filter_document_types: Vec<String>,
    keep_filtered_metadata: bool,
) -> PyResult<(PyObject, PyObject, PyObject)> {
    let options = WriteOptions {
        filter_document_types,
        keep_filtered_metadata,
    };
    let parsed = parse_sgml(data);

    let events: Vec<SubmissionEvent<'_>> = parsed.standardized.events().collect();
    let metadata_json = serde_json::to_vec(&events_to_json(&events))
        .map_err(|e| PyValueError::new_err(format!("JSON error: {e}")))?;
    let csv = document_csv(&parsed.documents, &options);

    let py_documents: Vec<PyObject> = parsed
        .documents
        .documents
        .iter()
        .filter(|doc| options.selects(doc))
        .map(|doc| PyBytes::new_bound(py, doc.payload()).into())
        .collect();

    Ok((
        PyBytes::new_bound(py, &metadata_json).into(),
        PyBytes::new_bound(py, &csv).into(),
        py_documents.into_py(py),
    ))
}

/// Python module definition
#[pymodule]
fn secsgml_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(parse_to_json, m)?)?;
    Ok(())
}
