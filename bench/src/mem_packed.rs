use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;

use packints::elias_fano::EliasFanoEncoder;
use packints::packed::prelude::*;
use packints::packed::{
    DeltaAppendBuffer, FixedWidthArray, GrowableArray, MonotonicAppendBuffer, PagedGrowableArray,
    PlainAppendBuffer, COMPACT, DEFAULT, FASTEST,
};
use packints::Serializable;

const SEED_VALUES: u64 = 113;
const NUM_VALUES: usize = 1 << 20;

fn gen_random_ints(len: usize, max: u64, seed: u64) -> Vec<u64> {
    let mut rng = ChaChaRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(0..max)).collect()
}

fn main() {
    show_memories("uniform_10bits", &gen_random_ints(NUM_VALUES, 1 << 10, SEED_VALUES));
    show_memories("uniform_27bits", &gen_random_ints(NUM_VALUES, 1 << 27, SEED_VALUES));

    let mut sorted = gen_random_ints(NUM_VALUES, 1 << 30, SEED_VALUES);
    sorted.sort_unstable();
    show_memories("sorted_30bits", &sorted);
}

fn show_data_stats(vals: &[u64]) {
    let nvals = vals.len();
    let max = vals.iter().cloned().max().unwrap();
    let mean = vals.iter().map(|&x| x as f64).sum::<f64>() / nvals as f64;
    println!("Basic: n_vals={nvals}, max_val={max}, mean_val={mean:.3}");
}

fn show_memories(title: &str, vals: &[u64]) {
    println!("[{title}]");
    show_data_stats(vals);

    let bytes = {
        let arr = FixedWidthArray::from_slice(vals).unwrap();
        arr.size_in_bytes()
    };
    print_memory("FixedWidthArray (serialized)", bytes, vals.len());

    for (name, ratio) in [("COMPACT", COMPACT), ("DEFAULT", DEFAULT), ("FASTEST", FASTEST)] {
        let bytes = {
            let mut arr = GrowableArray::new(vals.len(), 1, ratio).unwrap();
            vals.iter().enumerate().for_each(|(i, &x)| arr.update(i, x).unwrap());
            arr.ram_bytes_used()
        };
        print_memory(&format!("GrowableArray/{name}"), bytes, vals.len());
    }

    let bytes = {
        let mut arr = PagedGrowableArray::new(vals.len(), 1 << 14, 1, COMPACT).unwrap();
        vals.iter().enumerate().for_each(|(i, &x)| arr.update(i, x).unwrap());
        arr.ram_bytes_used()
    };
    print_memory("PagedGrowableArray", bytes, vals.len());

    let bytes = {
        let mut buf = PlainAppendBuffer::default();
        vals.iter().for_each(|&x| buf.add(x).unwrap());
        buf.freeze().unwrap();
        buf.ram_bytes_used()
    };
    print_memory("PlainAppendBuffer", bytes, vals.len());

    let bytes = {
        let mut buf = DeltaAppendBuffer::default();
        vals.iter().for_each(|&x| buf.add(x).unwrap());
        buf.freeze().unwrap();
        buf.ram_bytes_used()
    };
    print_memory("DeltaAppendBuffer", bytes, vals.len());

    let bytes = {
        let mut buf = MonotonicAppendBuffer::default();
        vals.iter().for_each(|&x| buf.add(x).unwrap());
        buf.freeze().unwrap();
        buf.ram_bytes_used()
    };
    print_memory("MonotonicAppendBuffer", bytes, vals.len());

    if vals.windows(2).all(|w| w[0] <= w[1]) {
        let bytes = {
            let upper_bound = *vals.last().unwrap();
            let mut enc = EliasFanoEncoder::new(vals.len(), upper_bound).unwrap();
            vals.iter().for_each(|&x| enc.encode_next(x).unwrap());
            enc.size_in_bytes()
        };
        print_memory("EliasFanoEncoder (serialized)", bytes, vals.len());
    }
}

fn print_memory(name: &str, bytes: usize, nvals: usize) {
    println!(
        "{}: {:.3} bits per value",
        name,
        (bytes * 8) as f64 / nvals as f64
    );
}
