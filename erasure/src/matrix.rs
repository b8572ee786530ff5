use crate::error::Error;

// Dense row-major matrix over GF(2^8)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    values: Vec<u8>,
    width: usize,
}

impl Matrix {
    pub fn new(height: usize, width: usize) -> Self {
        Matrix {
            values: vec![0; height * width],
            width,
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut matrix = Matrix::new(n, n);
        for i in 0..n {
            matrix.set(i, i, 1);
        }
        matrix
    }

    // Vandermonde matrix in exponent form: values[r][c] = r^c. Any square
    // submatrix built from distinct rows is invertible.
    pub fn vandermonde(height: usize, width: usize) -> Self {
        let mut matrix = Matrix::new(height, width);
        for r in 0..height {
            for c in 0..width {
                matrix.set(r, c, galois::exp(r as u8, c));
            }
        }
        matrix
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.values.len() / self.width
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        assert!(row < self.height() && col < self.width);
        self.values[row * self.width + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        assert!(row < self.height() && col < self.width);
        self.values[row * self.width + col] = value;
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.values[row * self.width..(row + 1) * self.width]
    }

    pub fn times(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(
            self.width,
            rhs.height(),
            "Incompatible dimensions for multiplication"
        );

        let mut result = Matrix::new(self.height(), rhs.width());
        for r in 0..self.height() {
            for c in 0..rhs.width() {
                let mut acc = 0;
                for i in 0..self.width {
                    acc ^= galois::mul(self.get(r, i), rhs.get(i, c));
                }
                result.set(r, c, acc);
            }
        }
        result
    }

    // Selects rows by index, preserving the order of `rows`
    pub fn sub_matrix(&self, rows: &[usize]) -> Matrix {
        let mut values = Vec::with_capacity(rows.len() * self.width);
        for &r in rows {
            values.extend_from_slice(self.row(r));
        }
        Matrix {
            values,
            width: self.width,
        }
    }

    // Gauss-Jordan elimination with partial pivoting. The field has no
    // ordering, so any nonzero entry works as a pivot.
    pub fn invert(&self) -> Result<Matrix, Error> {
        let n = self.width;
        assert_eq!(n, self.height(), "Matrix must be square");

        // Eliminate on a working copy while mirroring every row operation
        // onto an identity-seeded companion
        let mut a = self.clone();
        let mut inv = Matrix::identity(n);

        for i in 0..n {
            let mut pivot_row = i;
            for j in i..n {
                if a.get(j, i) != 0 {
                    pivot_row = j;
                    break;
                }
            }
            if a.get(pivot_row, i) == 0 {
                return Err(Error::SingularMatrix);
            }

            if i != pivot_row {
                a.swap_rows(i, pivot_row);
                inv.swap_rows(i, pivot_row);
            }

            let pivot_inv = galois::inv(a.get(i, i)).map_err(|_| Error::SingularMatrix)?;
            a.scale_row(i, pivot_inv);
            inv.scale_row(i, pivot_inv);

            for j in 0..n {
                if j == i {
                    continue;
                }
                let factor = a.get(j, i);
                if factor != 0 {
                    a.add_scaled_row(j, i, factor);
                    inv.add_scaled_row(j, i, factor);
                }
            }
        }

        Ok(inv)
    }

    fn swap_rows(&mut self, row1: usize, row2: usize) {
        if row1 == row2 {
            return;
        }
        let start1 = row1 * self.width;
        let start2 = row2 * self.width;
        for i in 0..self.width {
            self.values.swap(start1 + i, start2 + i);
        }
    }

    fn scale_row(&mut self, row: usize, scalar: u8) {
        let start = row * self.width;
        for value in &mut self.values[start..start + self.width] {
            *value = galois::mul(*value, scalar);
        }
    }

    // row[target] ^= factor * row[source]; addition is XOR in GF(2^8)
    fn add_scaled_row(&mut self, target: usize, source: usize, factor: u8) {
        let source_row = self.row(source).to_vec();
        let start = target * self.width;
        for (value, &s) in self.values[start..start + self.width]
            .iter_mut()
            .zip(source_row.iter())
        {
            *value ^= galois::mul(factor, s);
        }
    }
}

// The (k + m) x k encoding matrix in systematic form: a Vandermonde matrix
// normalized by the inverse of its top k x k square, so the top k rows become
// the identity and data shards map to themselves.
pub fn encoding_matrix(data_shards: usize, total_shards: usize) -> Result<Matrix, Error> {
    let vandermonde = Matrix::vandermonde(total_shards, data_shards);
    let top = vandermonde.sub_matrix(&(0..data_shards).collect::<Vec<_>>());
    Ok(vandermonde.times(&top.invert()?))
}
