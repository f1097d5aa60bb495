/*!
# I/O Utilities for Saving Chains and Posterior Samples to CSV

Enable via the `csv` feature.
*/

use ndarray::{Array1, Array3, Axis};
use std::error::Error;
use std::fs::File;

use csv::Writer;

/// Saves a raw chain of shape `[step, walker, 3]` as a CSV file.
///
/// The file carries a `step,walker,cosi,rstar,prot` header and one row per
/// (step, walker) pair, step-major.
pub fn save_chain(chain: &Array3<f64>, filename: &str) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(filename)?);
    wtr.write_record(["step", "walker", "cosi", "rstar", "prot"])?;

    for (step_idx, step) in chain.axis_iter(Axis(0)).enumerate() {
        for (walker_idx, theta) in step.axis_iter(Axis(0)).enumerate() {
            let mut row = vec![step_idx.to_string(), walker_idx.to_string()];
            row.extend(theta.iter().map(|v| v.to_string()));
            wtr.write_record(&row)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Saves a posterior sample as a single-column `cosi` CSV file.
pub fn save_posterior(sample: &Array1<f64>, filename: &str) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(filename)?);
    wtr.write_record(["cosi"])?;
    for value in sample {
        wtr.write_record([value.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array3};
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn chain_rows_are_step_major() {
        let chain = Array3::from_shape_fn((2, 2, 3), |(s, w, p)| {
            (100 * s + 10 * w + p) as f64
        });
        let file = NamedTempFile::new().expect("Could not create temp file");
        let filename = file.path().to_str().unwrap();

        save_chain(&chain, filename).unwrap();

        let contents = fs::read_to_string(filename).unwrap();
        let expected = "\
step,walker,cosi,rstar,prot
0,0,0,1,2
0,1,10,11,12
1,0,100,101,102
1,1,110,111,112";
        assert_eq!(contents.trim(), expected);
    }

    #[test]
    fn empty_chain_writes_only_the_header() {
        let chain = Array3::<f64>::zeros((0, 4, 3));
        let file = NamedTempFile::new().expect("Could not create temp file");
        let filename = file.path().to_str().unwrap();

        save_chain(&chain, filename).unwrap();

        let contents = fs::read_to_string(filename).unwrap();
        assert_eq!(contents.trim(), "step,walker,cosi,rstar,prot");
    }

    #[test]
    fn posterior_is_a_single_column() {
        let sample = arr1(&[0.25, 0.5]);
        let file = NamedTempFile::new().expect("Could not create temp file");
        let filename = file.path().to_str().unwrap();

        save_posterior(&sample, filename).unwrap();

        let contents = fs::read_to_string(filename).unwrap();
        assert_eq!(contents.trim(), "cosi\n0.25\n0.5");
    }
}
