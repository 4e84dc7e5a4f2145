//! Text staging for the 2 x 20 character display.

use crate::connection::Connection;
use crate::error::ClientError;
use std::sync::Arc;

/// Characters per row.
pub const LINE_LENGTH: usize = 20;

/// Rows on the display.
pub const LINE_COUNT: usize = 2;

/// Write-then-flush staging grid.
///
/// Rows start out as zero bytes. Contents are never read back from the
/// device; the grid is blanked after every flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySurface {
    rows: [[u8; LINE_LENGTH]; LINE_COUNT],
}

impl DisplaySurface {
    pub fn new() -> Self {
        Self {
            rows: [[0; LINE_LENGTH]; LINE_COUNT],
        }
    }

    /// Copies `data` into row `y` starting at column `x`.
    ///
    /// Bytes past the end of the row are dropped. Writes to a row outside the
    /// grid, or starting past the last column, are ignored.
    pub fn write_text(&mut self, x: usize, y: usize, data: &[u8]) {
        let Some(row) = self.rows.get_mut(y) else {
            return;
        };
        if x >= LINE_LENGTH {
            return;
        }
        let len = data.len().min(LINE_LENGTH - x);
        row[x..x + len].copy_from_slice(&data[..len]);
    }

    pub fn row(&self, y: usize) -> Option<&[u8]> {
        self.rows.get(y).map(|r| r.as_slice())
    }

    /// All rows concatenated, top to bottom.
    pub fn contents(&self) -> Vec<u8> {
        self.rows.concat()
    }

    /// Returns the contents and blanks the grid.
    pub fn take(&mut self) -> Vec<u8> {
        let text = self.contents();
        self.clear();
        text
    }

    pub fn clear(&mut self) {
        self.rows = [[0; LINE_LENGTH]; LINE_COUNT];
    }

    /// `(columns, rows)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (LINE_LENGTH, LINE_COUNT)
    }
}

impl Default for DisplaySurface {
    fn default() -> Self {
        Self::new()
    }
}

/// Stages text and sends it to the display on flush.
pub struct TextDisplay {
    surface: DisplaySurface,
    connection: Arc<Connection>,
}

impl TextDisplay {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self {
            surface: DisplaySurface::new(),
            connection,
        }
    }

    pub fn write_text(&mut self, x: usize, y: usize, data: &[u8]) {
        self.surface.write_text(x, y, data);
    }

    /// Sends the staged grid as one DisplayText command and blanks it.
    ///
    /// The grid is blanked even when the write fails.
    pub fn flush(&mut self) -> Result<(), ClientError> {
        let text = self.surface.take();
        self.connection.display_text(&text)
    }

    /// Blanks the staged grid without sending anything.
    pub fn clear(&mut self) {
        self.surface.clear();
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.surface.dimensions()
    }

    pub fn surface(&self) -> &DisplaySurface {
        &self.surface
    }
}
