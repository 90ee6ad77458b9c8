use std::path::Path;

use chrono::{Days, NaiveDate};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len())]
    }
}

const HEADER: [&str; 15] = [
    "state_name",
    "city_name",
    "Party_Name",
    "item_name",
    "invoice_date",
    "invoice_no",
    "qty",
    "rate",
    "Taxable_Value",
    "cgst",
    "sgst",
    "igst",
    "invoice_value",
    "t_code",
    "location_code",
];

fn main() {
    let mut rng = SimpleRng::new(42);

    let geography: [(&str, &[&str]); 4] = [
        ("Goa", &["Panaji", "Margao", "Vasco"]),
        ("Kerala", &["Kochi", "Thrissur"]),
        ("Karnataka", &["Bengaluru", "Mysuru", "Hubballi"]),
        ("Maharashtra", &["Mumbai", "Pune"]),
    ];
    let parties = ["Acme Traders", "Bolt Distributors", "Coastal Hardware", "Deccan Supplies", "Evergreen Stores"];
    let items = [("Cement Bag", 380.0), ("Steel Rod", 910.0), ("PVC Pipe", 145.0), ("Paint Drum", 2250.0), ("Tile Box", 640.0)];
    let t_codes = ["01", "02"];
    let locations = ["L01", "L02", "L03"];

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid start date");
    let home_state = "Goa";

    let output_path = Path::new("data").join("erp_sales_data.csv");
    std::fs::create_dir_all("data").expect("Failed to create data directory");
    let mut writer = csv::Writer::from_path(&output_path).expect("Failed to create output file");
    writer.write_record(HEADER).expect("Failed to write header");

    let rows = 600;
    for n in 0..rows {
        let (state, cities) = *rng.pick(&geography);
        let city = *rng.pick(cities);
        let party = *rng.pick(&parties);
        let (item, base_rate) = *rng.pick(&items);
        let date = start + Days::new(rng.below(180) as u64);
        let qty = 1 + rng.below(40) as i64;
        let rate = (base_rate * (0.9 + 0.2 * rng.next_f64()) * 100.0).round() / 100.0;
        let taxable = (qty as f64 * rate * 100.0).round() / 100.0;
        // Intra-state sales split GST; inter-state sales carry IGST.
        let (cgst, sgst, igst) = if state == home_state {
            let half = (taxable * 0.09 * 100.0).round() / 100.0;
            (half, half, 0.0)
        } else {
            (0.0, 0.0, (taxable * 0.18 * 100.0).round() / 100.0)
        };
        let invoice_value = ((taxable + cgst + sgst + igst) * 100.0).round() / 100.0;

        writer
            .write_record([
                state.to_string(),
                city.to_string(),
                party.to_string(),
                item.to_string(),
                date.format("%Y-%m-%d").to_string(),
                format!("INV{:05}", n + 1),
                qty.to_string(),
                format!("{rate:.2}"),
                format!("{taxable:.2}"),
                format!("{cgst:.2}"),
                format!("{sgst:.2}"),
                format!("{igst:.2}"),
                format!("{invoice_value:.2}"),
                rng.pick(&t_codes).to_string(),
                rng.pick(&locations).to_string(),
            ])
            .expect("Failed to write row");
    }
    writer.flush().expect("Failed to flush output");

    println!("Wrote {rows} invoices to {}", output_path.display());
}
