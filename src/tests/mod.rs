mod test_helpers;
mod test_interpolation;

use crate::core::SpectralParams;

pub const SMALL_PARAMS: SpectralParams = SpectralParams {
    n: 16,
    res: 8,
    k: 5,
    lb: 0.0,
    ub: 1.0,
    sigma: 1.0,
};

pub(crate) fn init() {
    crate::init();
}
