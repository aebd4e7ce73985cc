//! Connection descriptors derived from a file path.

use std::fmt;
use std::path::{Path, PathBuf};

use sheetq_result::{Error, Result};

/// File formats a driver can be asked to open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileKind {
    Xlsx,
    Xlsm,
    Xlsb,
    Xls,
    /// Delimited text (`.csv` or `.txt`).
    Csv,
}

impl FileKind {
    /// Detect the kind from the extension, ignoring case.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" => Ok(FileKind::Xlsx),
            "xlsm" => Ok(FileKind::Xlsm),
            "xlsb" => Ok(FileKind::Xlsb),
            "xls" => Ok(FileKind::Xls),
            "csv" | "txt" => Ok(FileKind::Csv),
            other => Err(Error::InvalidArgumentError(format!(
                "unsupported file extension '{other}' for '{}'",
                path.display()
            ))),
        }
    }

    pub fn is_delimited(self) -> bool {
        matches!(self, FileKind::Csv)
    }
}

/// Everything a driver needs to open a file, plus the provider-style
/// connection string the settings fold into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub path: PathBuf,
    pub kind: FileKind,
    pub has_header: bool,
    pub read_only: bool,
    connection_string: String,
}

impl ConnectionDescriptor {
    pub fn for_file(path: impl Into<PathBuf>, has_header: bool, read_only: bool) -> Result<Self> {
        let path = path.into();
        let kind = FileKind::from_path(&path)?;
        let connection_string = render_connection_string(&path, kind, has_header, read_only);
        Ok(Self {
            path,
            kind,
            has_header,
            read_only,
            connection_string,
        })
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Directory holding the file; delimited-text drivers treat it as the
    /// database and each file in it as a table.
    pub fn directory(&self) -> &Path {
        containing_directory(&self.path)
    }

    /// Bare file name, the table token of a delimited-text source.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.connection_string)
    }
}

fn render_connection_string(path: &Path, kind: FileKind, has_header: bool, read_only: bool) -> String {
    let hdr = if has_header { "YES" } else { "NO" };
    let read_only = if read_only { ";READONLY=TRUE" } else { "" };
    match kind {
        FileKind::Xlsx | FileKind::Xlsm => format!(
            "Provider=Microsoft.ACE.OLEDB.12.0;Data Source={};Extended Properties=\"Excel 12.0 Xml;HDR={hdr};IMEX=1{read_only}\"",
            path.display()
        ),
        FileKind::Xlsb => format!(
            "Provider=Microsoft.ACE.OLEDB.12.0;Data Source={};Extended Properties=\"Excel 12.0;HDR={hdr};IMEX=1{read_only}\"",
            path.display()
        ),
        FileKind::Xls => format!(
            "Provider=Microsoft.Jet.OLEDB.4.0;Data Source={};Extended Properties=\"Excel 8.0;HDR={hdr};IMEX=1{read_only}\"",
            path.display()
        ),
        FileKind::Csv => format!(
            "Provider=Microsoft.Jet.OLEDB.4.0;Data Source={};Extended Properties=\"text;HDR={hdr};FMT=Delimited;IMEX=1{read_only}\"",
            containing_directory(path).display()
        ),
    }
}

/// Parent directory of `path`; `.` for a bare file name.
fn containing_directory(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excel_2007_descriptor() {
        let desc = ConnectionDescriptor::for_file("data/Companies.xlsx", true, true).unwrap();
        assert_eq!(desc.kind, FileKind::Xlsx);
        assert_eq!(
            desc.connection_string(),
            "Provider=Microsoft.ACE.OLEDB.12.0;Data Source=data/Companies.xlsx;Extended Properties=\"Excel 12.0 Xml;HDR=YES;IMEX=1;READONLY=TRUE\""
        );
    }

    #[test]
    fn legacy_and_binary_workbooks() {
        let xls = ConnectionDescriptor::for_file("book.XLS", false, false).unwrap();
        assert_eq!(xls.kind, FileKind::Xls);
        assert!(xls.connection_string().contains("Jet.OLEDB.4.0"));
        assert!(xls.connection_string().contains("Excel 8.0;HDR=NO;IMEX=1\""));

        let xlsb = ConnectionDescriptor::for_file("book.xlsb", true, false).unwrap();
        assert!(xlsb.connection_string().contains("\"Excel 12.0;HDR=YES"));
    }

    #[test]
    fn delimited_text_points_at_the_directory() {
        let csv = ConnectionDescriptor::for_file("data/Companies.csv", true, true).unwrap();
        assert!(csv.kind.is_delimited());
        assert!(csv.connection_string().contains("Data Source=data;"));
        assert!(csv.connection_string().contains("FMT=Delimited"));
        assert_eq!(csv.file_name(), "Companies.csv");
        assert_eq!(csv.directory(), Path::new("data"));
    }

    #[test]
    fn bare_file_names_use_the_current_directory() {
        let csv = ConnectionDescriptor::for_file("Companies.csv", true, true).unwrap();
        assert_eq!(csv.directory(), Path::new("."));
        assert!(csv.connection_string().contains("Data Source=.;"));
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        assert!(matches!(
            ConnectionDescriptor::for_file("notes.docx", true, true),
            Err(Error::InvalidArgumentError(_))
        ));
    }
}
