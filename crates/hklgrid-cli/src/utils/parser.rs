use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid unit cell '{0}'. Expected six comma-separated numbers 'a,b,c,alpha,beta,gamma'.")]
    InvalidCell(String),

    #[error("Invalid grid size '{0}'. Expected three positive integers 'nh,nk,nl'.")]
    InvalidGridSize(String),
}

/// Parses `a,b,c,alpha,beta,gamma`; whitespace around the numbers is ignored.
pub fn parse_cell(s: &str) -> Result<[f64; 6], ParseError> {
    let values = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ParseError::InvalidCell(s.to_string()))?;
    values
        .try_into()
        .map_err(|_| ParseError::InvalidCell(s.to_string()))
}

/// Parses `nh,nk,nl` with every dimension positive.
pub fn parse_grid_size(s: &str) -> Result<[usize; 3], ParseError> {
    let values = s
        .split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ParseError::InvalidGridSize(s.to_string()))?;
    let size: [usize; 3] = values
        .try_into()
        .map_err(|_| ParseError::InvalidGridSize(s.to_string()))?;
    if size.contains(&0) {
        return Err(ParseError::InvalidGridSize(s.to_string()));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cell_accepts_six_numbers() {
        assert_eq!(
            parse_cell("40, 50.5,60,90,100.25,90").unwrap(),
            [40.0, 50.5, 60.0, 90.0, 100.25, 90.0]
        );
    }

    #[test]
    fn parse_cell_rejects_wrong_count_or_garbage() {
        assert!(matches!(parse_cell("40,50,60"), Err(ParseError::InvalidCell(_))));
        assert!(matches!(
            parse_cell("40,50,60,90,90,abc"),
            Err(ParseError::InvalidCell(_))
        ));
    }

    #[test]
    fn parse_grid_size_requires_three_positive_integers() {
        assert_eq!(parse_grid_size("64,72, 90").unwrap(), [64, 72, 90]);
        assert!(parse_grid_size("64,72").is_err());
        assert!(parse_grid_size("64,0,90").is_err());
        assert!(parse_grid_size("64,-1,90").is_err());
    }
}
