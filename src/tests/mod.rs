mod test_utils;
mod test_conversions;
mod test_pagination;
