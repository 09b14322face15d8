pub mod common;

#[cfg(test)]
mod test_dispatch_order;


#[cfg(test)]
mod test_residual;



#[cfg(test)]
mod test_action_order;
