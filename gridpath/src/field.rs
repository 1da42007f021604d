use std::fmt::Display;

use anyhow::{anyhow, bail};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::graph::Point;

/// Characters used when printing a field, from dark to bright
const SHADES: &[u8] = b" .:-=+*#%@";

/// A non-empty rectangular field of intensities in `[0, 255]`, stored row-major.
///
/// The only way to obtain one is through a constructor that validates the input, so the graph
/// builder can rely on the field being well-formed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<i64>>", into = "Vec<Vec<u8>>")]
pub struct IntensityField {
    rows: usize,
    columns: usize,
    values: Vec<u8>,
}

impl IntensityField {
    /// Build a field from nested rows, rejecting empty, ragged or out-of-range input.
    pub fn from_rows<T: Copy + Into<i64>>(rows: &[Vec<T>]) -> Result<Self, anyhow::Error> {
        let columns = rows
            .first()
            .map(|r| r.len())
            .ok_or_else(|| anyhow!("intensity field has no rows"))?;

        if columns == 0 {
            bail!("intensity field has empty rows");
        }

        let mut values = Vec::with_capacity(rows.len() * columns);
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != columns {
                bail!(
                    "intensity field is ragged: row {} has {} columns, expected {}",
                    row,
                    cells.len(),
                    columns
                );
            }
            for (col, &value) in cells.iter().enumerate() {
                let value: i64 = value.into();
                let value = u8::try_from(value).map_err(|_| {
                    anyhow!(
                        "intensity {} at ({}, {}) is outside [0, 255]",
                        value,
                        row,
                        col
                    )
                })?;
                values.push(value);
            }
        }

        Ok(Self {
            rows: rows.len(),
            columns,
            values,
        })
    }

    /// Build a field from an already row-major buffer of intensities
    pub fn from_raw(rows: usize, columns: usize, values: Vec<u8>) -> Result<Self, anyhow::Error> {
        if rows == 0 || columns == 0 {
            bail!("intensity field must not be empty ({}x{})", rows, columns);
        }
        if values.len() != rows * columns {
            bail!(
                "intensity buffer holds {} values, expected {}x{}={}",
                values.len(),
                rows,
                columns,
                rows * columns
            );
        }

        Ok(Self {
            rows,
            columns,
            values,
        })
    }

    /// Draw every cell uniformly from `[0, 255]`.
    pub fn random<R: Rng + ?Sized>(
        rows: usize,
        columns: usize,
        rng: &mut R,
    ) -> Result<Self, anyhow::Error> {
        let values = (0..rows * columns).map(|_| rng.gen::<u8>()).collect();
        Self::from_raw(rows, columns, values)
    }

    /// Same as [`IntensityField::random`] but reproducible for a given seed.
    pub fn random_seeded(rows: usize, columns: usize, seed: u64) -> Result<Self, anyhow::Error> {
        Self::random(rows, columns, &mut StdRng::seed_from_u64(seed))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn get(&self, point: Point) -> Option<u8> {
        if point.row < self.rows && point.col < self.columns {
            Some(self.values[point.row * self.columns + point.col])
        } else {
            None
        }
    }

    /// Iterate over every cell in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Point, u8)> + '_ {
        self.values.iter().enumerate().map(|(i, &v)| {
            (
                Point {
                    row: i / self.columns,
                    col: i % self.columns,
                },
                v,
            )
        })
    }

    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.values
            .chunks(self.columns)
            .map(|row| row.to_vec())
            .collect()
    }
}

impl TryFrom<Vec<Vec<i64>>> for IntensityField {
    type Error = anyhow::Error;

    fn try_from(rows: Vec<Vec<i64>>) -> Result<Self, Self::Error> {
        Self::from_rows(&rows)
    }
}

impl From<IntensityField> for Vec<Vec<u8>> {
    fn from(field: IntensityField) -> Self {
        field.to_rows()
    }
}

impl Display for IntensityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.values.chunks(self.columns) {
            for &value in row {
                let shade = SHADES[value as usize * SHADES.len() / 256];
                write!(f, "{}", shade as char)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
