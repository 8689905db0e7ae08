mod net;
pub mod utils;

pub use net::{NetCfgTable, PoolTable, ScriptTable, TrackerTable};

// Error Handling
use fpnd_error::FpndError;
use log::{log_enabled, Level};
use tabled::{settings::Style, Table, Tabled};

/**
* Format vec of T to table
*/
pub fn default<T>(vec: Vec<T>) -> Result<String, FpndError>
where
    T: Tabled,
{
    let mut res = Table::new(&vec);
    if log_enabled!(Level::Info) {
        res.with(Style::rounded());
    } else {
        res.with(Style::psql());
    }
    Ok(res.to_string())
}
