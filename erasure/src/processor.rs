#[cfg(feature = "parallel")]
use rayon::prelude::*;

// Shard bytes processed per worker. Output at byte i depends only on inputs
// at byte i, so chunks combine by disjoint-range writes with no ordering
// requirement between them.
const CHUNK_SIZE: usize = 32 * 1024;

// output[i] = XOR over j of row[j] * inputs[j][i]
//
// One matrix row applied to the full set of input shards; this inner loop is
// where nearly all of the encode/reconstruct time goes.
pub fn apply_row(row: &[u8], inputs: &[&[u8]], output: &mut [u8]) {
    debug_assert_eq!(row.len(), inputs.len());

    #[cfg(feature = "parallel")]
    output
        .par_chunks_mut(CHUNK_SIZE)
        .enumerate()
        .for_each(|(chunk, out)| apply_row_range(row, inputs, chunk * CHUNK_SIZE, out));

    #[cfg(not(feature = "parallel"))]
    apply_row_range(row, inputs, 0, output);
}

fn apply_row_range(row: &[u8], inputs: &[&[u8]], offset: usize, output: &mut [u8]) {
    output.fill(0);
    for (&coef, input) in row.iter().zip(inputs) {
        if coef == 0 {
            continue;
        }
        for (out, &byte) in output.iter_mut().zip(&input[offset..]) {
            *out ^= galois::mul(coef, byte);
        }
    }
}

// output[i] ^= coef * input[i]
//
// Folds one shard's contribution into an accumulator shard; the kernel of
// incremental encoding.
pub fn accumulate_row(coef: u8, input: &[u8], output: &mut [u8]) {
    debug_assert_eq!(input.len(), output.len());
    if coef == 0 {
        return;
    }

    #[cfg(feature = "parallel")]
    output
        .par_chunks_mut(CHUNK_SIZE)
        .zip(input.par_chunks(CHUNK_SIZE))
        .for_each(|(out, inp)| accumulate_row_range(coef, inp, out));

    #[cfg(not(feature = "parallel"))]
    accumulate_row_range(coef, input, output);
}

fn accumulate_row_range(coef: u8, input: &[u8], output: &mut [u8]) {
    for (out, &byte) in output.iter_mut().zip(input) {
        *out ^= galois::mul(coef, byte);
    }
}
